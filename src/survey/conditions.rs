use serde::Deserialize;
use serde_json::{Map, Value};

/// A boolean expression over the answer/meta context.
///
/// JSON shape: `{"any": [..]}`, `{"all": [..]}`, `{"not": ..}` or a leaf
/// `{"var": "answers.q1", "op": "gte", "value": 5}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Any {
        any: Vec<Condition>,
    },
    All {
        all: Vec<Condition>,
    },
    Not {
        not: Box<Condition>,
    },
    Leaf {
        var: String,
        op: Op,
        #[serde(default)]
        value: Value,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Eq,
    Lte,
    Gte,
    Includes,
    In,
    Exists,
}

pub struct EvalContext<'a> {
    pub answers: &'a Map<String, Value>,
    pub meta: &'a Map<String, Value>,
}

impl<'a> EvalContext<'a> {
    pub fn new(answers: &'a Map<String, Value>, meta: &'a Map<String, Value>) -> Self {
        Self { answers, meta }
    }

    /// Resolve `answers.<id>` or `meta.<key>`.
    fn resolve(&self, var: &str) -> Option<&'a Value> {
        let (scope, key) = var.split_once('.')?;
        match scope {
            "answers" => self.answers.get(key),
            "meta" => self.meta.get(key),
            _ => None,
        }
    }
}

impl Condition {
    pub fn eval(&self, ctx: &EvalContext) -> bool {
        match self {
            Condition::Any { any } => any.iter().any(|c| c.eval(ctx)),
            Condition::All { all } => all.iter().all(|c| c.eval(ctx)),
            Condition::Not { not } => !not.eval(ctx),
            Condition::Leaf { var, op, value } => eval_leaf(ctx.resolve(var), *op, value),
        }
    }
}

fn eval_leaf(resolved: Option<&Value>, op: Op, value: &Value) -> bool {
    if op == Op::Exists {
        return matches!(resolved, Some(v) if !v.is_null());
    }

    // Missing variables are falsy for every other operator.
    let Some(resolved) = resolved else {
        return false;
    };

    match op {
        Op::Eq => {
            if let (Some(a), Some(b)) = (resolved.as_f64(), value.as_f64()) {
                a == b
            } else {
                resolved == value
            }
        }
        Op::Lte => match (resolved.as_f64(), value.as_f64()) {
            (Some(a), Some(b)) => a <= b,
            _ => false,
        },
        Op::Gte => match (resolved.as_f64(), value.as_f64()) {
            (Some(a), Some(b)) => a >= b,
            _ => false,
        },
        Op::Includes => match resolved {
            Value::Array(items) => items.contains(value),
            Value::String(s) => value.as_str().map(|needle| s.contains(needle)).unwrap_or(false),
            _ => false,
        },
        Op::In => match value {
            Value::Array(items) => items.contains(resolved),
            _ => false,
        },
        Op::Exists => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx_with(answers: Value) -> (Map<String, Value>, Map<String, Value>) {
        let answers = answers.as_object().unwrap().clone();
        (answers, Map::new())
    }

    fn parse(json: Value) -> Condition {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_gte_leaf() {
        let cond = parse(json!({"var": "answers.q1", "op": "gte", "value": 5}));

        let (answers, meta) = ctx_with(json!({"q1": 7}));
        assert!(cond.eval(&EvalContext::new(&answers, &meta)));

        let (answers, meta) = ctx_with(json!({"q1": 4}));
        assert!(!cond.eval(&EvalContext::new(&answers, &meta)));

        let (answers, meta) = ctx_with(json!({"q1": 5}));
        assert!(cond.eval(&EvalContext::new(&answers, &meta)));
    }

    #[test]
    fn test_missing_var_is_falsy() {
        let cond = parse(json!({"var": "answers.absent", "op": "eq", "value": 1}));
        let (answers, meta) = ctx_with(json!({}));
        assert!(!cond.eval(&EvalContext::new(&answers, &meta)));
    }

    #[test]
    fn test_exists() {
        let cond = parse(json!({"var": "answers.q1", "op": "exists"}));

        let (answers, meta) = ctx_with(json!({"q1": "yes"}));
        assert!(cond.eval(&EvalContext::new(&answers, &meta)));

        let (answers, meta) = ctx_with(json!({}));
        assert!(!cond.eval(&EvalContext::new(&answers, &meta)));
    }

    #[test]
    fn test_includes_on_array_answer() {
        let cond = parse(json!({"var": "answers.channels", "op": "includes", "value": "delivery"}));
        let (answers, meta) = ctx_with(json!({"channels": ["store", "delivery"]}));
        assert!(cond.eval(&EvalContext::new(&answers, &meta)));

        let (answers, meta) = ctx_with(json!({"channels": ["store"]}));
        assert!(!cond.eval(&EvalContext::new(&answers, &meta)));
    }

    #[test]
    fn test_in_operator() {
        let cond = parse(json!({"var": "answers.freq", "op": "in", "value": ["weekly", "monthly"]}));
        let (answers, meta) = ctx_with(json!({"freq": "weekly"}));
        assert!(cond.eval(&EvalContext::new(&answers, &meta)));

        let (answers, meta) = ctx_with(json!({"freq": "never"}));
        assert!(!cond.eval(&EvalContext::new(&answers, &meta)));
    }

    #[test]
    fn test_nested_any_all_not() {
        let cond = parse(json!({
            "any": [
                {"all": [
                    {"var": "answers.nps", "op": "lte", "value": 6},
                    {"not": {"var": "answers.contacted", "op": "exists"}}
                ]},
                {"var": "meta.vip", "op": "eq", "value": true}
            ]
        }));

        let answers = json!({"nps": 4}).as_object().unwrap().clone();
        let meta = Map::new();
        assert!(cond.eval(&EvalContext::new(&answers, &meta)));

        let answers = json!({"nps": 9}).as_object().unwrap().clone();
        let meta = json!({"vip": true}).as_object().unwrap().clone();
        assert!(cond.eval(&EvalContext::new(&answers, &meta)));

        let answers = json!({"nps": 9}).as_object().unwrap().clone();
        let meta = Map::new();
        assert!(!cond.eval(&EvalContext::new(&answers, &meta)));
    }

    #[test]
    fn test_eq_numeric_cross_type() {
        // 5 and 5.0 compare equal.
        let cond = parse(json!({"var": "answers.q", "op": "eq", "value": 5}));
        let (answers, meta) = ctx_with(json!({"q": 5.0}));
        assert!(cond.eval(&EvalContext::new(&answers, &meta)));
    }
}
