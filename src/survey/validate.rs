use crate::survey::QuestionKind;
use serde_json::Value;

/// Validate an answer value against the question kind.
///
/// Returns the stable rejection reason on failure: "type", "range",
/// "choice", "limit" or "length".
pub fn validate_answer(kind: &QuestionKind, value: &Value) -> Result<(), &'static str> {
    match kind {
        QuestionKind::Slider { min, max } => {
            let Some(n) = value.as_i64() else {
                return Err("type");
            };
            if n < *min || n > *max {
                return Err("range");
            }
            Ok(())
        }
        QuestionKind::Single { options } => {
            let Some(s) = value.as_str() else {
                return Err("type");
            };
            if !options.iter().any(|o| o == s) {
                return Err("choice");
            }
            Ok(())
        }
        QuestionKind::Multi {
            options,
            max_select,
        } => {
            let Some(items) = value.as_array() else {
                return Err("type");
            };
            if let Some(limit) = max_select
                && items.len() > *limit
            {
                return Err("limit");
            }
            for item in items {
                let Some(s) = item.as_str() else {
                    return Err("type");
                };
                if !options.iter().any(|o| o == s) {
                    return Err("choice");
                }
            }
            Ok(())
        }
        QuestionKind::Text { max_len } => {
            let Some(s) = value.as_str() else {
                return Err("type");
            };
            if s.chars().count() > *max_len {
                return Err("length");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn slider() -> QuestionKind {
        QuestionKind::Slider { min: 0, max: 10 }
    }

    fn single() -> QuestionKind {
        QuestionKind::Single {
            options: vec!["a".into(), "b".into()],
        }
    }

    #[test]
    fn test_slider_in_range() {
        assert!(validate_answer(&slider(), &json!(0)).is_ok());
        assert!(validate_answer(&slider(), &json!(10)).is_ok());
    }

    #[test]
    fn test_slider_out_of_range_rejected_with_range() {
        assert_eq!(validate_answer(&slider(), &json!(11)), Err("range"));
        assert_eq!(validate_answer(&slider(), &json!(-1)), Err("range"));
    }

    #[test]
    fn test_slider_non_numeric_rejected_with_type() {
        assert_eq!(validate_answer(&slider(), &json!("7")), Err("type"));
    }

    #[test]
    fn test_single_choice_membership() {
        assert!(validate_answer(&single(), &json!("a")).is_ok());
        assert_eq!(validate_answer(&single(), &json!("z")), Err("choice"));
        assert_eq!(validate_answer(&single(), &json!(1)), Err("type"));
    }

    #[test]
    fn test_multi_choice() {
        let kind = QuestionKind::Multi {
            options: vec!["x".into(), "y".into(), "z".into()],
            max_select: Some(2),
        };
        assert!(validate_answer(&kind, &json!(["x", "z"])).is_ok());
        assert_eq!(validate_answer(&kind, &json!(["x", "y", "z"])), Err("limit"));
        assert_eq!(validate_answer(&kind, &json!(["x", "w"])), Err("choice"));
        assert_eq!(validate_answer(&kind, &json!("x")), Err("type"));
    }

    #[test]
    fn test_text_length_cap() {
        let kind = QuestionKind::Text { max_len: 5 };
        assert!(validate_answer(&kind, &json!("hello")).is_ok());
        assert_eq!(validate_answer(&kind, &json!("hello!")), Err("length"));
        assert_eq!(validate_answer(&kind, &json!(42)), Err("type"));
    }
}
