//! A hand-written recursive descent parser for the condition language.
//!
//! The grammar, in order of increasing precedence:
//!
//! ```text
//! expression := compound ( "or" compound )*
//! compound   := atom ( "and" atom )*
//! atom       := "not" atom | "(" expression ")" | function
//! function   := name "(" arguments ")"
//! ```
use super::{Comparator, ExpressionNode, Function};

/// Represents an error encountered while parsing a condition string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConditionParseError {
    expected: &'static str,
    context: String,
}

impl ConditionParseError {
    fn new(expected: &'static str, input: &str, position: usize) -> Self {
        let context: String = input
            .get(position..)
            .unwrap_or("")
            .chars()
            .take(50)
            .collect();

        Self {
            expected,
            context: context.trim().to_owned(),
        }
    }
}

impl std::fmt::Display for ConditionParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "expected {} at \"{}\"", self.expected, self.context)
    }
}

impl std::error::Error for ConditionParseError {}

pub(super) fn parse_expression(input: &str) -> Result<ExpressionNode, ConditionParseError> {
    let mut parser = Parser { input, position: 0 };

    let node = parser.expression()?;

    parser.skip_whitespace();
    if parser.position != parser.input.len() {
        return Err(parser.error("end of condition"));
    }

    Ok(node)
}

struct Parser<'a> {
    input: &'a str,
    position: usize,
}

impl Parser<'_> {
    fn expression(&mut self) -> Result<ExpressionNode, ConditionParseError> {
        let first = self.compound()?;

        let mut nodes = vec![first];
        while self.accept_keyword("or") {
            nodes.push(self.compound()?);
        }

        if nodes.len() == 1 {
            Ok(into_single_node(nodes))
        } else {
            Ok(ExpressionNode::Any(nodes))
        }
    }

    fn compound(&mut self) -> Result<ExpressionNode, ConditionParseError> {
        let first = self.atom()?;

        let mut nodes = vec![first];
        while self.accept_keyword("and") {
            nodes.push(self.atom()?);
        }

        if nodes.len() == 1 {
            Ok(into_single_node(nodes))
        } else {
            Ok(ExpressionNode::All(nodes))
        }
    }

    fn atom(&mut self) -> Result<ExpressionNode, ConditionParseError> {
        self.skip_whitespace();

        if self.accept_keyword("not") {
            return Ok(ExpressionNode::Not(Box::new(self.atom()?)));
        }

        if self.accept("(") {
            let node = self.expression()?;
            self.expect(")")?;
            return Ok(node);
        }

        self.function().map(ExpressionNode::Function)
    }

    fn function(&mut self) -> Result<Function, ConditionParseError> {
        self.skip_whitespace();

        // many_active must be tried before many, as many is a prefix of it.
        if self.accept("file(") {
            let path = self.file_path()?;
            self.expect(")")?;
            Ok(Function::FilePath(path))
        } else if self.accept("regex(") {
            let regex = self.quoted_string()?;
            self.expect(")")?;
            Ok(Function::FileRegex(regex))
        } else if self.accept("active(") {
            let path = self.file_path()?;
            self.expect(")")?;
            Ok(Function::Active(path))
        } else if self.accept("checksum(") {
            let path = self.file_path()?;
            self.expect(",")?;
            let crc = self.hex_integer()?;
            self.expect(")")?;
            Ok(Function::Checksum(path, crc))
        } else if self.accept("version(") {
            let path = self.file_path()?;
            self.expect(",")?;
            let version = self.quoted_string()?;
            self.expect(",")?;
            let comparator = self.comparator()?;
            self.expect(")")?;
            Ok(Function::Version(path, version, comparator))
        } else if self.accept("many_active(") {
            let regex = self.quoted_string()?;
            self.expect(")")?;
            Ok(Function::ManyActive(regex))
        } else if self.accept("many(") {
            let regex = self.quoted_string()?;
            self.expect(")")?;
            Ok(Function::Many(regex))
        } else {
            Err(self.error("a condition function"))
        }
    }

    fn quoted_string(&mut self) -> Result<String, ConditionParseError> {
        self.quoted(|c| c != '"', "a quoted string")
    }

    /// Like a quoted string, but characters that are invalid in paths are
    /// rejected so that an unterminated path argument fails early.
    fn file_path(&mut self) -> Result<String, ConditionParseError> {
        self.quoted(
            |c| !matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|'),
            "a quoted file path",
        )
    }

    fn quoted(
        &mut self,
        is_valid: impl Fn(char) -> bool,
        description: &'static str,
    ) -> Result<String, ConditionParseError> {
        self.skip_whitespace();

        if !self.accept("\"") {
            return Err(self.error(description));
        }

        let rest = self.remaining();
        let end = rest
            .char_indices()
            .find(|(_, c)| !is_valid(*c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());

        let value = rest[..end].to_owned();
        self.position += end;

        if value.is_empty() || !self.accept("\"") {
            return Err(self.error(description));
        }

        Ok(value)
    }

    fn hex_integer(&mut self) -> Result<u32, ConditionParseError> {
        self.skip_whitespace();

        // Allow but don't require a 0x prefix.
        let _found_prefix = self.accept("0x") || self.accept("0X");

        let rest = self.remaining();
        let end = rest
            .char_indices()
            .find(|(_, c)| !c.is_ascii_hexdigit())
            .map(|(i, _)| i)
            .unwrap_or(rest.len());

        let digits = &rest[..end];

        match u32::from_str_radix(digits, 16) {
            Ok(value) => {
                self.position += end;
                Ok(value)
            }
            Err(_) => Err(self.error("a hexadecimal integer")),
        }
    }

    fn comparator(&mut self) -> Result<Comparator, ConditionParseError> {
        self.skip_whitespace();

        // The two-character comparators must be tried before their
        // one-character prefixes.
        if self.accept("==") {
            Ok(Comparator::Equal)
        } else if self.accept("!=") {
            Ok(Comparator::NotEqual)
        } else if self.accept("<=") {
            Ok(Comparator::LessThanOrEqual)
        } else if self.accept(">=") {
            Ok(Comparator::GreaterThanOrEqual)
        } else if self.accept("<") {
            Ok(Comparator::LessThan)
        } else if self.accept(">") {
            Ok(Comparator::GreaterThan)
        } else {
            Err(self.error("a comparator"))
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.remaining();
        let skipped = rest.len() - rest.trim_start().len();
        self.position += skipped;
    }

    fn accept(&mut self, token: &str) -> bool {
        if self.remaining().starts_with(token) {
            self.position += token.len();
            true
        } else {
            false
        }
    }

    /// Accept a keyword, which unlike a plain token must be followed by
    /// whitespace or a parenthesis so that e.g. "nothing" is not read as
    /// "not hing".
    fn accept_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();

        let rest = self.remaining();
        if let Some(after) = rest.strip_prefix(keyword)
            && after
                .chars()
                .next()
                .is_none_or(|c| c.is_whitespace() || c == '(')
        {
            self.position += keyword.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &'static str) -> Result<(), ConditionParseError> {
        self.skip_whitespace();

        if self.accept(token) {
            Ok(())
        } else {
            Err(self.error(token))
        }
    }

    fn remaining(&self) -> &str {
        self.input.get(self.position..).unwrap_or("")
    }

    fn error(&self, expected: &'static str) -> ConditionParseError {
        ConditionParseError::new(expected, self.input, self.position)
    }
}

fn into_single_node(mut nodes: Vec<ExpressionNode>) -> ExpressionNode {
    nodes
        .pop()
        .unwrap_or_else(|| ExpressionNode::All(Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> ExpressionNode {
        parse_expression(input).unwrap()
    }

    mod parse_expression {
        use super::*;

        #[test]
        fn should_parse_a_file_function() {
            assert_eq!(
                ExpressionNode::Function(Function::FilePath("Foo.esp".into())),
                parse("file(\"Foo.esp\")")
            );
        }

        #[test]
        fn should_parse_a_relative_file_path() {
            assert_eq!(
                ExpressionNode::Function(Function::FilePath("sub dir/Foo.esp".into())),
                parse("file(\"sub dir/Foo.esp\")")
            );
        }

        #[test]
        fn should_error_if_a_file_path_contains_invalid_characters() {
            assert!(parse_expression("file(\"Foo*.esp\")").is_err());
        }

        #[test]
        fn should_parse_a_regex_function() {
            assert_eq!(
                ExpressionNode::Function(Function::FileRegex("Foo.*\\.esp".into())),
                parse("regex(\"Foo.*\\.esp\")")
            );
        }

        #[test]
        fn should_parse_an_active_function() {
            assert_eq!(
                ExpressionNode::Function(Function::Active("Foo.esp".into())),
                parse("active(\"Foo.esp\")")
            );
        }

        #[test]
        fn should_parse_a_checksum_function() {
            assert_eq!(
                ExpressionNode::Function(Function::Checksum("Foo.esp".into(), 0xDEAD_BEEF)),
                parse("checksum(\"Foo.esp\", DEADBEEF)")
            );
        }

        #[test]
        fn should_parse_a_checksum_function_with_a_hex_prefix() {
            assert_eq!(
                ExpressionNode::Function(Function::Checksum("Foo.esp".into(), 0xDEAD_BEEF)),
                parse("checksum(\"Foo.esp\", 0xDEADBEEF)")
            );
        }

        #[test]
        fn should_parse_a_version_function() {
            assert_eq!(
                ExpressionNode::Function(Function::Version(
                    "Foo.esp".into(),
                    "1.0".into(),
                    Comparator::GreaterThanOrEqual
                )),
                parse("version(\"Foo.esp\", \"1.0\", >=)")
            );
        }

        #[test]
        fn should_parse_many_and_many_active_functions() {
            assert_eq!(
                ExpressionNode::Function(Function::Many("Foo.*\\.esp".into())),
                parse("many(\"Foo.*\\.esp\")")
            );
            assert_eq!(
                ExpressionNode::Function(Function::ManyActive("Foo.*\\.esp".into())),
                parse("many_active(\"Foo.*\\.esp\")")
            );
        }

        #[test]
        fn should_parse_not_with_higher_precedence_than_and() {
            assert_eq!(
                ExpressionNode::All(vec![
                    ExpressionNode::Not(Box::new(ExpressionNode::Function(Function::FilePath(
                        "A.esp".into()
                    )))),
                    ExpressionNode::Function(Function::FilePath("B.esp".into())),
                ]),
                parse("not file(\"A.esp\") and file(\"B.esp\")")
            );
        }

        #[test]
        fn should_parse_and_with_higher_precedence_than_or() {
            assert_eq!(
                ExpressionNode::Any(vec![
                    ExpressionNode::Function(Function::FilePath("A.esp".into())),
                    ExpressionNode::All(vec![
                        ExpressionNode::Function(Function::FilePath("B.esp".into())),
                        ExpressionNode::Function(Function::FilePath("C.esp".into())),
                    ]),
                ]),
                parse("file(\"A.esp\") or file(\"B.esp\") and file(\"C.esp\")")
            );
        }

        #[test]
        fn should_parse_parentheses_as_overriding_precedence() {
            assert_eq!(
                ExpressionNode::All(vec![
                    ExpressionNode::Any(vec![
                        ExpressionNode::Function(Function::FilePath("A.esp".into())),
                        ExpressionNode::Function(Function::FilePath("B.esp".into())),
                    ]),
                    ExpressionNode::Function(Function::FilePath("C.esp".into())),
                ]),
                parse("( file(\"A.esp\") or file(\"B.esp\") ) and file(\"C.esp\")")
            );
        }

        #[test]
        fn should_error_if_input_is_empty() {
            assert!(parse_expression("").is_err());
        }

        #[test]
        fn should_error_if_there_is_trailing_input() {
            assert!(parse_expression("file(\"A.esp\") garbage").is_err());
        }

        #[test]
        fn should_error_if_a_function_is_unterminated() {
            assert!(parse_expression("file(\"A.esp\"").is_err());
        }

        #[test]
        fn should_error_if_a_function_name_is_unknown() {
            assert!(parse_expression("exists(\"A.esp\")").is_err());
        }

        #[test]
        fn should_error_if_a_comparator_is_invalid() {
            assert!(parse_expression("version(\"A.esp\", \"1.0\", =>)").is_err());
        }

        #[test]
        fn should_include_the_failure_context_in_the_error_message() {
            let error = parse_expression("file(\"A.esp\") or banana").unwrap_err();

            assert!(error.to_string().contains("banana"));
        }
    }
}
