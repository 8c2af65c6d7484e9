//! The variable capability served through the variable map.
//!
//! A [`Variable`] produces its current value on demand and, when writable,
//! takes part in the four-phase Set: `test` stages a new value, then the
//! master follows with `commit`, `undo` and finally `cleanup`.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    error::{Error, ResponseError, Result},
    oid::Oid,
    value::Value,
};

/// Outcome of the test phase of a Set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestResult {
    NoError,
    GenErr,
    NoAccess,
    WrongType,
    WrongLength,
    WrongEncoding,
    WrongValue,
    NoCreation,
    InconsistentValue,
    ResourceUnavailable,
    NotWritable,
    InconsistentName,
}

impl TestResult {
    pub fn is_ok(self) -> bool {
        self == TestResult::NoError
    }
}

impl From<TestResult> for ResponseError {
    fn from(result: TestResult) -> Self {
        match result {
            TestResult::NoError => ResponseError::NoAgentXError,
            TestResult::GenErr => ResponseError::GenErr,
            TestResult::NoAccess => ResponseError::NoAccess,
            TestResult::WrongType => ResponseError::WrongType,
            TestResult::WrongLength => ResponseError::WrongLength,
            TestResult::WrongEncoding => ResponseError::WrongEncoding,
            TestResult::WrongValue => ResponseError::WrongValue,
            TestResult::NoCreation => ResponseError::NoCreation,
            TestResult::InconsistentValue => ResponseError::InconsistentValue,
            TestResult::ResourceUnavailable => ResponseError::ResourceUnavailable,
            TestResult::NotWritable => ResponseError::NotWritable,
            TestResult::InconsistentName => ResponseError::InconsistentName,
        }
    }
}

/// A managed object instance.
///
/// Only `get` is required; the defaults describe a read-only object.
/// `commit`, `undo` and `cleanup` are only called after `test` returned
/// [`TestResult::NoError`] for the same transaction.
pub trait Variable: Send {
    /// Returns the current value. Errors are reported to the master as
    /// genErr.
    fn get(&mut self) -> Result<Value>;

    /// Validates and stages `value` for a later commit.
    fn test(&mut self, _value: &Value) -> TestResult {
        TestResult::NotWritable
    }

    /// Applies the staged value. Returns false on failure.
    fn commit(&mut self) -> bool {
        false
    }

    /// Reverts a committed value. Returns false on failure.
    fn undo(&mut self) -> bool {
        false
    }

    /// Releases anything staged by `test`.
    fn cleanup(&mut self) {}

    /// The value as a table index fragment, or the null OID if the value
    /// cannot serve as an index.
    fn to_oid(&mut self) -> Oid {
        self.get()
            .map(|value| value.to_index_oid())
            .unwrap_or_default()
    }
}

/// A variable shared between the variable map and its owner.
pub type SharedVariable = Arc<Mutex<dyn Variable>>;

/// Wraps a variable for insertion into a session.
pub fn shared<V: Variable + 'static>(variable: V) -> SharedVariable {
    Arc::new(Mutex::new(variable))
}

/// Locks a shared variable, recovering from a poisoned lock.
pub(crate) fn lock(variable: &SharedVariable) -> MutexGuard<'_, dyn Variable + 'static> {
    variable
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A stored value, optionally writable by the master.
#[derive(Debug, Clone)]
pub struct Scalar {
    value: Value,
    writable: bool,
    pending: Option<Value>,
    previous: Option<Value>,
}

impl Scalar {
    /// A read-only scalar.
    pub fn new(value: Value) -> Self {
        Scalar {
            value,
            writable: false,
            pending: None,
            previous: None,
        }
    }

    /// A scalar that accepts Sets of the same type.
    pub fn writable(value: Value) -> Self {
        Scalar {
            writable: true,
            ..Scalar::new(value)
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Replaces the value locally, outside any Set transaction.
    pub fn set(&mut self, value: Value) {
        self.value = value;
    }
}

impl Variable for Scalar {
    fn get(&mut self) -> Result<Value> {
        Ok(self.value.clone())
    }

    fn test(&mut self, value: &Value) -> TestResult {
        if !self.writable {
            return TestResult::NotWritable;
        }
        if !self.value.same_type(value) {
            return TestResult::WrongType;
        }
        self.pending = Some(value.clone());
        TestResult::NoError
    }

    fn commit(&mut self) -> bool {
        match self.pending.take() {
            Some(value) => {
                self.previous = Some(std::mem::replace(&mut self.value, value));
                true
            }
            None => false,
        }
    }

    fn undo(&mut self) -> bool {
        match self.previous.take() {
            Some(value) => {
                self.value = value;
                true
            }
            None => false,
        }
    }

    fn cleanup(&mut self) {
        self.pending = None;
        self.previous = None;
    }
}

/// A read-only variable whose value is computed on every read.
pub struct Computed<F> {
    read: F,
}

impl<F> Computed<F>
where
    F: FnMut() -> Result<Value> + Send,
{
    pub fn new(read: F) -> Self {
        Computed { read }
    }
}

impl<F> fmt::Debug for Computed<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed").finish_non_exhaustive()
    }
}

impl<F> Variable for Computed<F>
where
    F: FnMut() -> Result<Value> + Send,
{
    fn get(&mut self) -> Result<Value> {
        (self.read)()
    }
}

/// Converts any displayable failure into [`Error::Variable`].
pub fn variable_error(reason: impl fmt::Display) -> Error {
    Error::Variable(reason.to_string())
}
