use crate::{
    conditions::{ConditionEvaluationError, State, evaluate_condition},
    metadata::{File, PluginCleaningData, PluginMetadata, Tag},
};

/// Evaluate the conditions on every item of the given metadata, dropping the
/// items whose conditions are false. Returns `None` if nothing other than the
/// name remains.
pub(crate) fn evaluate_all_conditions(
    mut metadata: PluginMetadata,
    state: &State,
) -> Result<Option<PluginMetadata>, ConditionEvaluationError> {
    metadata.set_load_after_files(filter_files_on_conditions(
        metadata.load_after_files(),
        state,
    )?);

    metadata.set_requirements(filter_files_on_conditions(metadata.requirements(), state)?);

    metadata.set_incompatibilities(filter_files_on_conditions(
        metadata.incompatibilities(),
        state,
    )?);

    metadata.set_messages(
        metadata
            .messages()
            .iter()
            .filter_map(|m| filter_map_on_condition(m, m.condition(), state))
            .collect::<Result<Vec<_>, _>>()?,
    );

    metadata.set_tags(
        metadata
            .tags()
            .iter()
            .filter_map(|t| filter_map_on_condition(t, t.condition(), state))
            .collect::<Result<Vec<Tag>, _>>()?,
    );

    if !metadata.is_regex_plugin() {
        metadata.set_dirty_info(filter_cleaning_data_on_crc(
            metadata.name(),
            metadata.dirty_info(),
            state,
        )?);

        metadata.set_clean_info(filter_cleaning_data_on_crc(
            metadata.name(),
            metadata.clean_info(),
            state,
        )?);
    }

    if metadata.has_name_only() {
        Ok(None)
    } else {
        Ok(Some(metadata))
    }
}

pub(crate) fn filter_map_on_condition<T: Clone>(
    item: &T,
    condition: Option<&str>,
    state: &State,
) -> Option<Result<T, ConditionEvaluationError>> {
    condition
        .map(|condition| evaluate_condition(condition, state))
        .unwrap_or(Ok(true))
        .map(|result| result.then(|| item.clone()))
        .transpose()
}

fn filter_files_on_conditions(
    files: &[File],
    state: &State,
) -> Result<Vec<File>, ConditionEvaluationError> {
    files
        .iter()
        .filter_map(|file| filter_map_on_condition(file, file.condition(), state))
        .collect()
}

/// Keep only the cleaning data entries whose CRCs match the installed
/// plugin's CRC. Expressing the check as a checksum condition means the
/// results go through the CRC and condition caches.
fn filter_cleaning_data_on_crc(
    plugin_name: &str,
    cleaning_info: &[PluginCleaningData],
    state: &State,
) -> Result<Vec<PluginCleaningData>, ConditionEvaluationError> {
    if plugin_name.is_empty() {
        return Ok(Vec::new());
    }

    cleaning_info
        .iter()
        .filter_map(|info| {
            let condition = format!("checksum(\"{}\", {:08X})", plugin_name, info.crc());

            filter_map_on_condition(info, Some(condition.as_str()), state)
        })
        .collect()
}
