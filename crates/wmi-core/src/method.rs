//! Method Executor - staged method invocation
//!
//! ```text
//! Unstarted --begin--> Building --execute--> Executed --end--> Finished
//!                        ^   |                 |  |
//!                        |   set               |  get
//!                        +-------- set --------+
//! ```
//!
//! Errors are accumulated: the first one wins, later calls become no-ops, and
//! the error is reported by `execute()` and `end()`. Calling an operation in
//! the wrong stage records a `Sequence` error.

use std::fmt;

use crate::convert::{FromValue, ToValue};
use crate::error::{WmiError, WmiResult};
use crate::instance::{Instance, Value};
use crate::service::Service;

/// Builder stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Created; signature not resolved yet
    Unstarted,
    /// Input parameters are being set
    Building,
    /// The method ran; outputs are readable
    Executed,
    /// `end()` was called
    Finished,
}

impl Stage {
    fn name(self) -> &'static str {
        match self {
            Stage::Unstarted => "unstarted",
            Stage::Building => "building parameters",
            Stage::Executed => "executed",
            Stage::Finished => "finished",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Staged builder for one method call.
///
/// The executor owns the input instance it spawns and every output instance
/// it receives; the object passed to [`MethodExecutor::new`] stays with the
/// caller.
pub struct MethodExecutor<'a> {
    service: &'a Service,
    object: Option<&'a Instance>,
    path: String,
    method: String,
    stage: Stage,
    input: Option<Instance>,
    output: Option<Instance>,
    error: Option<WmiError>,
}

impl<'a> MethodExecutor<'a> {
    /// Create an executor for `method` on the object at `path`.
    ///
    /// `object` is the class or instance used to resolve the signature; when
    /// absent the object at `path` is fetched.
    pub fn new(
        service: &'a Service,
        object: Option<&'a Instance>,
        path: &str,
        method: &str,
    ) -> Self {
        Self {
            service,
            object,
            path: path.to_string(),
            method: method.to_string(),
            stage: Stage::Unstarted,
            input: None,
            output: None,
            error: None,
        }
    }

    /// Current stage
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// First accumulated error, if any
    pub fn error(&self) -> Option<&WmiError> {
        self.error.as_ref()
    }

    /// Output parameters of the most recent `execute()`
    pub fn output(&self) -> Option<&Instance> {
        self.output.as_ref()
    }

    fn enter(&mut self, operation: &'static str, allowed: &[Stage]) -> bool {
        if self.error.is_some() {
            return false;
        }
        if !allowed.contains(&self.stage) {
            self.error = Some(WmiError::Sequence {
                operation,
                stage: self.stage.name(),
            });
            return false;
        }
        true
    }

    fn fail(&mut self, err: WmiError) {
        tracing::debug!(path = %self.path, method = %self.method, "method call failed: {}", err);
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    // ========================================================================
    // Stages
    // ========================================================================

    /// Resolve the method signature and spawn the input parameters.
    pub fn begin(&mut self) -> &mut Self {
        if !self.enter("begin", &[Stage::Unstarted]) {
            return self;
        }
        self.stage = Stage::Building;

        match self.spawn_input() {
            Ok(input) => self.input = input,
            Err(err) => self.fail(err),
        }
        self
    }

    fn spawn_input(&self) -> WmiResult<Option<Instance>> {
        let signature = match self.object {
            Some(object) => object.method(&self.method)?,
            None => self.service.get_object(&self.path)?.method(&self.method)?,
        };
        signature
            .input
            .as_ref()
            .map(Instance::spawn_instance)
            .transpose()
    }

    /// Set an input parameter.
    ///
    /// After `execute()` this returns the executor to building and drops the
    /// previous outputs.
    pub fn set<V: ToValue>(&mut self, name: &str, value: V) -> &mut Self {
        self.put_input(name, |input| input.put(name, value))
    }

    /// Set an input parameter from a dynamic value.
    pub fn set_value(&mut self, name: &str, value: Value) -> &mut Self {
        self.put_input(name, |input| input.put_value(name, value))
    }

    fn put_input(
        &mut self,
        name: &str,
        put: impl FnOnce(&Instance) -> WmiResult<()>,
    ) -> &mut Self {
        if !self.enter("set", &[Stage::Building, Stage::Executed]) {
            return self;
        }
        if self.stage == Stage::Executed {
            self.output = None;
            self.stage = Stage::Building;
        }

        let result = match &self.input {
            Some(input) => put(input),
            None => Err(WmiError::PropertyNotFound {
                name: name.to_string(),
                class: "__PARAMETERS".to_string(),
            }),
        };
        if let Err(err) = result {
            self.fail(err);
        }
        self
    }

    /// Run the method. Fails fast with any accumulated error.
    pub fn execute(&mut self) -> WmiResult<&mut Self> {
        if self.enter("execute", &[Stage::Building, Stage::Executed]) {
            self.output = None;
            match self
                .service
                .exec_method(&self.path, &self.method, self.input.as_ref())
            {
                Ok(output) => {
                    self.output = Some(output);
                    self.stage = Stage::Executed;
                }
                Err(err) => self.fail(err),
            }
        }

        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        Ok(self)
    }

    /// Read an output parameter of the most recent `execute()`.
    pub fn get<T: FromValue>(&mut self, name: &str, out: &mut T) -> &mut Self {
        if !self.enter("get", &[Stage::Executed]) {
            return self;
        }

        let result = match &self.output {
            Some(output) => output.get_as::<T>(name),
            None => Err(WmiError::PropertyNotFound {
                name: name.to_string(),
                class: "__PARAMETERS".to_string(),
            }),
        };
        match result {
            Ok(value) => *out = value,
            Err(err) => self.fail(err),
        }
        self
    }

    /// Finish and release the spawned input and the outputs.
    ///
    /// Returns the first error recorded by any stage.
    pub fn end(&mut self) -> WmiResult<()> {
        if self.stage == Stage::Finished && self.error.is_none() {
            self.error = Some(WmiError::Sequence {
                operation: "end",
                stage: self.stage.name(),
            });
        }
        self.stage = Stage::Finished;
        self.input = None;
        self.output = None;

        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for MethodExecutor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodExecutor")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("stage", &self.stage)
            .field("error", &self.error)
            .finish()
    }
}
