use super::*;

#[test]
fn test_parse_byte_size_units() {
    assert_eq!(parse_byte_size("123").unwrap(), 123);
    assert_eq!(parse_byte_size("123B").unwrap(), 123);
    assert_eq!(parse_byte_size("1KB").unwrap(), 1000);
    assert_eq!(parse_byte_size("1KiB").unwrap(), 1024);
    assert_eq!(parse_byte_size("2MB").unwrap(), 2_000_000);
    assert_eq!(parse_byte_size("2MiB").unwrap(), 2 * 1024 * 1024);
    assert_eq!(parse_byte_size("1GB").unwrap(), 1_000_000_000);
    assert_eq!(parse_byte_size("1GiB").unwrap(), 1024 * 1024 * 1024);
}

#[test]
fn test_parse_byte_size_decimals_and_spacing() {
    assert_eq!(parse_byte_size("1.5KiB").unwrap(), 1536);
    assert_eq!(parse_byte_size(" 4 KB ").unwrap(), 4000);
    assert_eq!(parse_byte_size("0.5MB").unwrap(), 500_000);
}

#[test]
fn test_parse_byte_size_rejects_garbage() {
    assert!(parse_byte_size("abc").is_err());
    assert!(parse_byte_size("10TB").is_err());
    assert!(parse_byte_size("").is_err());
}

#[test]
fn test_regex_operand_case_insensitive() {
    let sensitive = RegexOperand::new("^Mona.*$", false).unwrap();
    assert!(sensitive.is_match("Mona Lisa"));
    assert!(!sensitive.is_match("mona lisa"));

    let insensitive = RegexOperand::new("^Mona.*$", true).unwrap();
    assert!(insensitive.is_match("mona lisa"));
    assert_eq!(insensitive.pattern(), "^Mona.*$");
}

#[test]
fn test_regex_operand_wildcard_mapping() {
    let wildcard = RegexOperand::from_wildcard("sketch_?.*", false).unwrap();
    assert!(wildcard.is_match("sketch_1.png"));
    assert!(wildcard.is_match("sketch_a.kra"));
    assert!(!wildcard.is_match("sketch_10.png"));
    assert!(!wildcard.is_match("final_1.png"));
}

#[test]
fn test_regex_operand_literal_escapes_metacharacters() {
    let literal = RegexOperand::from_literal("a.b", false).unwrap();
    assert!(literal.is_match("a.b"));
    assert!(!literal.is_match("axb"));
    assert!(!literal.is_match("a.b.c"));
}

#[test]
fn test_regex_operand_invalid_pattern_is_rule_error() {
    assert!(RegexOperand::new("(unclosed", false).is_err());
}

#[test]
fn test_operand_display() {
    assert_eq!(Operand::Int(42).to_string(), "42");
    assert_eq!(Operand::Str("kra".into()).to_string(), "\"kra\"");
    assert_eq!(
        Operand::Range(Box::new(Operand::Int(1)), Box::new(Operand::Int(9))).to_string(),
        "(1, 9)"
    );
    assert_eq!(
        Operand::List(vec![Operand::Int(1), Operand::Int(2)]).to_string(),
        "[1, 2]"
    );
}
