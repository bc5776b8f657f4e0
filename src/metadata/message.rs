use saphyr::{MarkedYaml, Scalar, YamlData};

use super::{
    error::{
        ExpectedType, MetadataParsingErrorReason, MultilingualMessageContentsError,
        ParseMetadataError,
    },
    yaml::{
        TryFromYaml, YamlObjectType, as_mapping, get_required_string_value, get_value,
        parse_condition, reject_unknown_keys,
    },
};

/// Codes used to indicate the type of a message.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum MessageType {
    /// A notification message that is of no significant severity.
    #[default]
    Say,
    /// A warning message, used to indicate that an issue may be present that
    /// the user may wish to act on.
    Warn,
    /// An error message, used to indicate that an issue that requires user
    /// action is present.
    Error,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageType::Say => write!(f, "say"),
            MessageType::Warn => write!(f, "warn"),
            MessageType::Error => write!(f, "error"),
        }
    }
}

/// Represents a message's localised text content.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MessageContent {
    text: Box<str>,
    language: Box<str>,
}

impl MessageContent {
    /// The code for the default language assumed for message content.
    pub const DEFAULT_LANGUAGE: &'static str = "en";

    /// Create a value with the given text in the default language.
    #[must_use]
    pub fn new(text: String) -> Self {
        MessageContent {
            text: text.into_boxed_str(),
            ..Default::default()
        }
    }

    /// Set the language to the given value.
    #[must_use]
    pub fn with_language(mut self, language: String) -> Self {
        self.language = language.into_boxed_str();
        self
    }

    /// Get the message text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Get the text's language.
    pub fn language(&self) -> &str {
        &self.language
    }
}

impl std::default::Default for MessageContent {
    /// Create a value with an empty message string and the default language.
    fn default() -> Self {
        Self {
            text: Box::default(),
            language: MessageContent::DEFAULT_LANGUAGE.into(),
        }
    }
}

/// Choose a `MessageContent` object from those given in `content` based on
/// the given `language`.
///
/// Language strings are expected to have the form `[language code]` or
/// `[language code]_[country code]`, where `[language code]` is an ISO 639-1
/// language code and `[country code]` is an ISO 3166 country code.
///
/// * If the slice only contains a single element, that element is returned.
/// * If content with a language that exactly matches the given `language`
///   value is present, that content is returned.
/// * If there is no exact match but content for the same language code is
///   present, that content is returned.
/// * If no matches are found and content in the default language is present,
///   that content is returned.
/// * Otherwise, an empty `Option` is returned.
pub fn select_message_content<'a>(
    content: &'a [MessageContent],
    language: &str,
) -> Option<&'a MessageContent> {
    if content.is_empty() {
        None
    } else if let [c] = content {
        Some(c)
    } else {
        let language_code = language.split_once('_').map(|p| p.0);

        let mut matched = None;
        let mut english = None;

        for mc in content {
            if mc.language.as_ref() == language {
                return Some(mc);
            } else if matched.is_none() {
                if language_code.is_some_and(|c| c == mc.language.as_ref()) {
                    matched = Some(mc);
                } else if language_code.is_none()
                    && let Some((content_language_code, _)) = mc.language.split_once('_')
                    && content_language_code == language
                {
                    matched = Some(mc);
                }

                if mc.language.as_ref() == MessageContent::DEFAULT_LANGUAGE {
                    english = Some(mc);
                }
            }
        }

        matched.or(english)
    }
}

/// Represents a message with localisable text content.
#[derive(Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Message {
    message_type: MessageType,
    content: Box<[MessageContent]>,
    condition: Option<Box<str>>,
}

impl Message {
    /// Create a value with the given type and a content string in the language
    /// given by [`MessageContent::DEFAULT_LANGUAGE`].
    #[must_use]
    pub fn new(message_type: MessageType, content: String) -> Self {
        Self {
            message_type,
            content: Box::new([MessageContent::new(content)]),
            condition: None,
        }
    }

    /// Create a value with the given type and content. If more than one
    /// `MessageContent` object is given, one must use the language given by
    /// [`MessageContent::DEFAULT_LANGUAGE`].
    pub fn multilingual(
        message_type: MessageType,
        content: Vec<MessageContent>,
    ) -> Result<Self, MultilingualMessageContentsError> {
        validate_message_contents(&content)?;

        Ok(Self {
            message_type,
            content: content.into_boxed_slice(),
            condition: None,
        })
    }

    /// Set the condition string.
    #[must_use]
    pub fn with_condition(mut self, condition: String) -> Self {
        self.condition = Some(condition.into_boxed_str());
        self
    }

    /// Get the message type.
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Get the message content.
    pub fn content(&self) -> &[MessageContent] {
        &self.content
    }

    /// Get the condition string.
    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    /// Create a copy of this message that holds only the content for the
    /// given language, falling back to English content where no better match
    /// exists.
    #[must_use]
    pub(crate) fn localised(&self, language: &str) -> Message {
        match select_message_content(&self.content, language) {
            Some(content) => Message {
                message_type: self.message_type,
                content: Box::new([content.clone()]),
                condition: self.condition.clone(),
            },
            None => self.clone(),
        }
    }
}

pub(crate) fn validate_message_contents(
    contents: &[MessageContent],
) -> Result<(), MultilingualMessageContentsError> {
    if contents.len() > 1 {
        let english_string_exists = contents
            .iter()
            .any(|c| c.language.as_ref() == MessageContent::DEFAULT_LANGUAGE);

        if !english_string_exists {
            return Err(MultilingualMessageContentsError {});
        }
    }

    Ok(())
}

impl TryFromYaml for MessageContent {
    fn try_from_yaml(value: &MarkedYaml) -> Result<Self, ParseMetadataError> {
        let mapping = as_mapping(value, YamlObjectType::MessageContent)?;

        reject_unknown_keys(mapping, &["lang", "str"], YamlObjectType::MessageContent)?;

        let text =
            get_required_string_value(value.span.start, mapping, "str", YamlObjectType::Message)?;

        let language =
            get_required_string_value(value.span.start, mapping, "lang", YamlObjectType::Message)?;

        Ok(MessageContent {
            text: text.into(),
            language: language.into(),
        })
    }
}

pub(super) fn parse_message_contents_yaml(
    value: &MarkedYaml,
    key: &'static str,
    parent_yaml_type: YamlObjectType,
) -> Result<Box<[MessageContent]>, ParseMetadataError> {
    let contents = match &value.data {
        YamlData::Value(Scalar::String(s)) => Box::new([MessageContent::new(s.to_string())]),
        YamlData::Sequence(a) => a
            .iter()
            .map(MessageContent::try_from_yaml)
            .collect::<Result<Box<[_]>, _>>()?,
        _ => {
            return Err(ParseMetadataError::unexpected_value_type(
                value.span.start,
                key,
                parent_yaml_type,
                ExpectedType::ArrayOrString,
            ));
        }
    };

    if validate_message_contents(&contents).is_err() {
        Err(ParseMetadataError::new(
            value.span.start,
            MetadataParsingErrorReason::InvalidMultilingualMessageContents,
        ))
    } else {
        Ok(contents)
    }
}

impl TryFromYaml for Message {
    fn try_from_yaml(value: &MarkedYaml) -> Result<Self, ParseMetadataError> {
        let mapping = as_mapping(value, YamlObjectType::Message)?;

        reject_unknown_keys(
            mapping,
            &["type", "content", "condition"],
            YamlObjectType::Message,
        )?;

        let message_type =
            get_required_string_value(value.span.start, mapping, "type", YamlObjectType::Message)?;
        let message_type = match message_type {
            "warn" => MessageType::Warn,
            "error" => MessageType::Error,
            _ => MessageType::Say,
        };

        let content = match get_value(mapping, "content") {
            Some(n) => parse_message_contents_yaml(n, "content", YamlObjectType::Message)?,
            None => {
                return Err(ParseMetadataError::missing_key(
                    value.span.start,
                    "content",
                    YamlObjectType::Message,
                ));
            }
        };

        let condition = parse_condition(mapping, "condition", YamlObjectType::Message)?;

        Ok(Message {
            message_type,
            content,
            condition,
        })
    }
}
