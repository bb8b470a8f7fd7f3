//! Scripted update actions
//!
//! The updater never interprets scripts itself. A [`ScriptEngine`] turns
//! source text into a [`CompiledScript`], and [`ScriptedUpdateAction`] keeps
//! the compiled form around between iterations. [`RegisteredScripts`] is the
//! built-in engine: its "source" is the name of a Rust closure registered up
//! front.

use crate::core::errors::{ScriptError, UpdateError};
use crate::core::execution::actions::{ActionSpec, UpdateAction};
use crate::core::execution::controls::UpdateControls;
use log::{debug, error};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A script that compiled successfully and can be run every iteration
pub trait CompiledScript: Send + Sync {
    fn run(&self, controls: &dyn UpdateControls) -> Result<(), String>;
}

/// Compiles script source into something runnable
pub trait ScriptEngine: Send + Sync {
    fn compile(&self, source: &str) -> Result<Arc<dyn CompiledScript>, String>;
}

type ScriptFn = Arc<dyn Fn(&dyn UpdateControls) -> Result<(), String> + Send + Sync>;

struct RegisteredScript {
    body: ScriptFn,
}

impl CompiledScript for RegisteredScript {
    fn run(&self, controls: &dyn UpdateControls) -> Result<(), String> {
        (self.body)(controls)
    }
}

/// Script engine backed by named Rust closures
#[derive(Default)]
pub struct RegisteredScripts {
    scripts: RwLock<HashMap<String, ScriptFn>>,
}

impl RegisteredScripts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the closure run for `name`
    pub fn register<F>(&self, name: impl Into<String>, body: F)
    where
        F: Fn(&dyn UpdateControls) -> Result<(), String> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!("Registered script '{}'", name);
        self.scripts.write().insert(name, Arc::new(body));
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.scripts.write().remove(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scripts.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl ScriptEngine for RegisteredScripts {
    fn compile(&self, source: &str) -> Result<Arc<dyn CompiledScript>, String> {
        let name = source.trim();
        match self.scripts.read().get(name) {
            Some(body) => Ok(Arc::new(RegisteredScript {
                body: Arc::clone(body),
            })),
            None => Err(format!("no script registered as '{}'", name)),
        }
    }
}

/// Update action whose body comes from a script engine
///
/// A script that fails to compile leaves the action inert: invoking it does
/// nothing until `reinit` or `set_source` succeeds.
pub struct ScriptedUpdateAction {
    description: String,
    engine: Arc<dyn ScriptEngine>,
    source: RwLock<String>,
    compiled: RwLock<Option<Arc<dyn CompiledScript>>>,
    evaluation_error: RwLock<Option<ScriptError>>,
}

impl ScriptedUpdateAction {
    /// Create the action and compile its source right away
    pub fn new(
        description: impl Into<String>,
        source: impl Into<String>,
        engine: Arc<dyn ScriptEngine>,
    ) -> Self {
        let action = Self {
            description: description.into(),
            engine,
            source: RwLock::new(source.into()),
            compiled: RwLock::new(None),
            evaluation_error: RwLock::new(None),
        };
        let _ = action.reinit();
        action
    }

    /// Recompile the current source
    ///
    /// Safe to call any number of times; the outcome depends only on the
    /// current source and engine.
    pub fn reinit(&self) -> Result<(), ScriptError> {
        let source = self.source.read().clone();
        match self.engine.compile(&source) {
            Ok(script) => {
                *self.compiled.write() = Some(script);
                *self.evaluation_error.write() = None;
                debug!("Compiled scripted action '{}'", self.description);
                Ok(())
            }
            Err(message) => {
                let error = ScriptError::EvaluationFailure {
                    name: self.description.clone(),
                    message,
                };
                error!("{}; the action is inert", error);
                *self.compiled.write() = None;
                *self.evaluation_error.write() = Some(error.clone());
                Err(error)
            }
        }
    }

    /// Replace the source and recompile
    pub fn set_source(&self, source: impl Into<String>) -> Result<(), ScriptError> {
        *self.source.write() = source.into();
        self.reinit()
    }

    pub fn source(&self) -> String {
        self.source.read().clone()
    }

    pub fn is_inert(&self) -> bool {
        self.compiled.read().is_none()
    }

    /// The failure from the last compile, if it failed
    pub fn evaluation_error(&self) -> Option<ScriptError> {
        self.evaluation_error.read().clone()
    }
}

impl fmt::Debug for ScriptedUpdateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedUpdateAction")
            .field("description", &self.description)
            .field("source", &*self.source.read())
            .field("inert", &self.is_inert())
            .finish()
    }
}

impl UpdateAction for ScriptedUpdateAction {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn long_description(&self) -> String {
        format!("Scripted action '{}' ({})", self.description, self.source.read().trim())
    }

    fn invoke(&self, controls: &dyn UpdateControls) -> Result<(), UpdateError> {
        let script = match self.compiled.read().clone() {
            Some(script) => script,
            None => return Ok(()),
        };
        script.run(controls).map_err(|message| {
            ScriptError::RuntimeFailure {
                name: self.description.clone(),
                message,
            }
            .into()
        })
    }

    fn spec(&self) -> Option<ActionSpec> {
        Some(ActionSpec::Scripted {
            description: self.description.clone(),
            source: self.source(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_script_is_inert() {
        let engine = Arc::new(RegisteredScripts::new());
        let action = ScriptedUpdateAction::new("custom", "missing", engine);

        assert!(action.is_inert());
        assert!(matches!(
            action.evaluation_error(),
            Some(ScriptError::EvaluationFailure { .. })
        ));
    }

    #[test]
    fn test_reinit_picks_up_late_registration() {
        let engine = Arc::new(RegisteredScripts::new());
        let action = ScriptedUpdateAction::new("custom", "late", Arc::clone(&engine) as Arc<dyn ScriptEngine>);
        assert!(action.is_inert());

        engine.register("late", |_controls| Ok(()));
        action.reinit().unwrap();
        action.reinit().unwrap();
        assert!(!action.is_inert());
        assert_eq!(action.evaluation_error(), None);
    }

    #[test]
    fn test_set_source_to_unknown_script_makes_action_inert() {
        let engine = Arc::new(RegisteredScripts::new());
        engine.register("known", |_controls| Ok(()));
        let action = ScriptedUpdateAction::new("custom", " known ", Arc::clone(&engine) as Arc<dyn ScriptEngine>);
        assert!(!action.is_inert());

        assert!(action.set_source("unknown").is_err());
        assert!(action.is_inert());
        assert_eq!(action.source(), "unknown");
    }

    #[test]
    fn test_spec_carries_source() {
        let engine = Arc::new(RegisteredScripts::new());
        let action = ScriptedUpdateAction::new("custom", "anything", engine);
        assert_eq!(
            action.spec(),
            Some(ActionSpec::Scripted {
                description: "custom".to_string(),
                source: "anything".to_string(),
            })
        );
    }
}
