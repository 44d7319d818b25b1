use crate::{Context, Nameset, Ptr, PtrMut, Result, Value};
use smallvec::SmallVec;
use std::fmt;

/// The tag carried by each [Cons] cell
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConsTag {
    /// An ordinary pair
    #[default]
    Norm,
    /// A cell that wraps a list of forms that are evaluated as a single unit
    Blok,
}

/// A list cell with a value (`car`) and an optional tail (`cdr`)
///
/// Cons chains carry the argument lists that are passed to invocations. A list ends at the first
/// cell with no `cdr`, so an empty argument list is represented by `None` rather than by a cell.
///
/// Clones share the same cell.
#[derive(Clone)]
pub struct Cons(PtrMut<ConsCell>);

struct ConsCell {
    tag: ConsTag,
    car: Option<Value>,
    cdr: Option<Cons>,
}

// Long lists are released iteratively so that dropping them doesn't overflow the stack
impl Drop for ConsCell {
    fn drop(&mut self) {
        let mut next = self.cdr.take();

        while let Some(mut cons) = next {
            next = match Ptr::get_mut(&mut cons.0) {
                Some(cell) => cell.get_mut().cdr.take(),
                // The tail is shared, so it's released when its last owner is dropped
                None => None,
            };
        }
    }
}

impl Cons {
    /// Makes a new single-element list
    pub fn new(car: Value) -> Self {
        Self::with_tag(ConsTag::Norm, car)
    }

    /// Makes a new single-element list with the given tag
    pub fn with_tag(tag: ConsTag, car: Value) -> Self {
        Self::from_parts(tag, Some(car), None)
    }

    /// Makes a block from a sequence of forms
    ///
    /// The block's forms are evaluated in order, and the block evaluates to the result of its last
    /// form.
    pub fn block(forms: impl IntoIterator<Item = Value>) -> Self {
        Self::with_tag(ConsTag::Blok, Value::Null).with_forms(forms)
    }

    /// Makes a list from a sequence of values, or `None` if the sequence is empty
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Option<Self> {
        let values: SmallVec<[Value; 8]> = values.into_iter().collect();

        values
            .into_iter()
            .rev()
            .fold(None, |cdr, car| Some(Self::from_parts(ConsTag::Norm, Some(car), cdr)))
    }

    fn from_parts(tag: ConsTag, car: Option<Value>, cdr: Option<Cons>) -> Self {
        Self(PtrMut::from(ConsCell { tag, car, cdr }))
    }

    // Replaces the car and tail of a block cell with the given forms
    fn with_forms(self, forms: impl IntoIterator<Item = Value>) -> Self {
        let mut forms = forms.into_iter();
        if let Some(first) = forms.next() {
            self.set_car(Some(first));
            self.set_cdr(Self::from_values(forms));
        } else {
            self.set_car(None);
        }
        self
    }

    /// Appends a new cell with the given value to the end of the list
    pub fn push_back(&self, value: Value) {
        let last = self.last();
        let new_cell = Self::new(value);
        last.0.borrow_mut().cdr = Some(new_cell);
    }

    fn last(&self) -> Cons {
        let mut current = self.clone();
        while let Some(next) = current.cdr() {
            current = next;
        }
        current
    }

    /// The cell's tag
    pub fn tag(&self) -> ConsTag {
        self.0.borrow().tag
    }

    /// Returns true if the cell has the [ConsTag::Blok] tag
    pub fn is_block(&self) -> bool {
        self.tag() == ConsTag::Blok
    }

    /// The cell's value
    pub fn car(&self) -> Option<Value> {
        self.0.borrow().car.clone()
    }

    /// The remainder of the list following this cell
    pub fn cdr(&self) -> Option<Cons> {
        self.0.borrow().cdr.clone()
    }

    /// Replaces the cell's value
    pub fn set_car(&self, value: Option<Value>) {
        let _old = std::mem::replace(&mut self.0.borrow_mut().car, value);
    }

    /// Replaces the remainder of the list following this cell
    pub fn set_cdr(&self, cdr: Option<Cons>) {
        let _old = std::mem::replace(&mut self.0.borrow_mut().cdr, cdr);
    }

    /// Returns the value of the nth cell in the list
    pub fn get_car(&self, n: usize) -> Option<Value> {
        self.get_cdr(n).and_then(|cell| cell.car())
    }

    /// Returns the nth cell in the list, with the first cell at index 0
    pub fn get_cdr(&self, n: usize) -> Option<Cons> {
        let mut result = self.clone();
        for _ in 0..n {
            result = result.cdr()?;
        }
        Some(result)
    }

    /// The 2nd value in the list
    pub fn cadr(&self) -> Option<Value> {
        self.get_car(1)
    }

    /// The 3rd value in the list
    pub fn caddr(&self) -> Option<Value> {
        self.get_car(2)
    }

    /// The 4th value in the list
    pub fn cadddr(&self) -> Option<Value> {
        self.get_car(3)
    }

    /// The 5th value in the list
    pub fn caddddr(&self) -> Option<Value> {
        self.get_car(4)
    }

    /// The number of cells in the list, starting from this cell
    pub fn length(&self) -> usize {
        let mut result = 1;
        let mut current = self.cdr();
        while let Some(cell) = current {
            result += 1;
            current = cell.cdr();
        }
        result
    }

    /// Returns an iterator over the list's values
    ///
    /// Cells without a value yield `Null`.
    pub fn iter(&self) -> ConsIter {
        ConsIter {
            next: Some(self.clone()),
        }
    }

    /// Collects the list's values into a Vec
    pub fn to_vec(&self) -> Vec<Value> {
        self.iter().collect()
    }

    /// Returns true if the other Cons refers to the same cell
    pub fn is_same_instance(&self, other: &Self) -> bool {
        Ptr::ptr_eq(&self.0, &other.0)
    }

    fn parts(&self) -> (ConsTag, Option<Value>, Option<Cons>) {
        let cell = self.0.borrow();
        (cell.tag, cell.car.clone(), cell.cdr.clone())
    }

    /// Evaluates each value in the list, producing a new list
    ///
    /// The new list has the same structure and tags as the input list.
    pub fn eval(ctx: &mut Context, scope: &Nameset, list: Option<&Cons>) -> Result<Option<Cons>> {
        let Some(list) = list else {
            return Ok(None);
        };

        let mut cells = SmallVec::<[(ConsTag, Option<Value>); 8]>::new();
        let mut next = Some(list.clone());

        while let Some(cell) = next {
            let (tag, car, cdr) = cell.parts();
            let car = match car {
                Some(car) => Some(car.eval(ctx, scope)?),
                None => None,
            };
            cells.push((tag, car));
            next = cdr;
        }

        Ok(cells
            .into_iter()
            .rev()
            .fold(None, |cdr, (tag, car)| Some(Self::from_parts(tag, car, cdr))))
    }

    /// Evaluates a value that might be a list
    ///
    /// A Cons is evaluated as an argument list with [Cons::eval], any other value is evaluated as
    /// a form.
    pub fn to_value(ctx: &mut Context, scope: &Nameset, value: &Value) -> Result<Value> {
        match value {
            Value::Cons(list) => Ok(Self::eval(ctx, scope, Some(list))?.into()),
            _ => value.eval(ctx, scope),
        }
    }

    /// Evaluates the list as a form
    ///
    /// A [ConsTag::Norm] list is a call form: the first value is evaluated to find the callee,
    /// which is then applied to the remaining values. A [ConsTag::Blok] list evaluates each of
    /// its forms in turn, resulting in the value of the last form.
    pub fn eval_form(&self, ctx: &mut Context, scope: &Nameset) -> Result<Value> {
        let (tag, car, cdr) = self.parts();

        match tag {
            ConsTag::Norm => match car {
                Some(callee) => {
                    let callee = callee.eval(ctx, scope)?;
                    ctx.nested(|ctx| callee.apply(ctx, scope, cdr.as_ref()))
                }
                None => Ok(Value::Null),
            },
            ConsTag::Blok => {
                if car.is_none() {
                    return Ok(Value::Null);
                }

                let mut result = Value::Null;
                for form in self.iter() {
                    result = form.eval(ctx, scope)?;
                }
                Ok(result)
            }
        }
    }
}

/// An iterator over the values in a [Cons] list
pub struct ConsIter {
    next: Option<Cons>,
}

impl Iterator for ConsIter {
    type Item = Value;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let (_, car, cdr) = current.parts();
        self.next = cdr;
        Some(car.unwrap_or_default())
    }
}

impl fmt::Display for Cons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, close) = match self.tag() {
            ConsTag::Norm => ("(", ")"),
            ConsTag::Blok => ("{", "}"),
        };

        f.write_str(open)?;
        for (i, value) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{value:?}")?;
        }
        f.write_str(close)
    }
}
