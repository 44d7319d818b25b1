use alder_runtime::{Result, prelude::*};

/// A mutable cell object for testing in-place assignment
///
/// - Assigning an `Int` to a binding that holds the cell updates the cell's value in place.
/// - `get` evaluates to the cell's value.
/// - `add` increments the cell's value by its single `Int` argument, and returns the new value.
#[derive(Debug, Default)]
pub struct TestCell {
    value: i64,
}

impl TestCell {
    /// Makes a new cell wrapped as a [Value]
    pub fn make_value(value: i64) -> Value {
        Object::from(Self { value }).into()
    }

    /// Returns the value held by a cell
    ///
    /// Panics if the value isn't a `TestCell`.
    pub fn get(value: &Value) -> i64 {
        match value {
            Value::Object(o) => o.cast::<Self>().expect("Expected a TestCell").value,
            other => panic!("Expected a TestCell, found '{}'", other.type_as_string()),
        }
    }
}

impl AlderObject for TestCell {
    fn type_string(&self) -> KString {
        "TestCell".into()
    }

    fn display(&self) -> String {
        format!("TestCell({})", self.value)
    }

    fn assign(&mut self, value: &Value) -> Result<bool> {
        match value {
            Value::Int(n) => {
                self.value = *n;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn invoke_by_name(
        &mut self,
        _ctx: &mut Context,
        _scope: &Nameset,
        name: Quark,
        args: Option<Cons>,
    ) -> Result<Option<Value>> {
        if name.name() != "add" {
            return Ok(None);
        }

        let args = args.map(|args| args.to_vec()).unwrap_or_default();
        match args.as_slice() {
            [Value::Int(n)] => {
                self.value += n;
                Ok(Some(self.value.into()))
            }
            unexpected => unexpected_args("|Int|", unexpected),
        }
    }

    fn has_member(&self, name: Quark) -> bool {
        matches!(name.name().as_str(), "get" | "add")
    }

    fn evaluate_member(&self, name: Quark) -> Result<Option<Value>> {
        match name.name().as_str() {
            "get" => Ok(Some(self.value.into())),
            _ => Ok(None),
        }
    }
}
