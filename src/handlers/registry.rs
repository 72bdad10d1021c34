//! Handler class registry
//!
//! Maps class names to factories and mini-game type tags to their default
//! class. Passed to the orchestrator at construction; there is no global
//! registry.

use ahash::AHashMap;

use super::{
    CalibrationHandler, ManipulationHandler, MiniGameHandler, SequenceHandler, SweetspotHandler,
    TemperatureHandler, TimingHandler,
};
use crate::core::error::{MiniGameError, Result};
use crate::core::tag::Tag;
use crate::definition::MiniGameDefinition;
use crate::tags;

/// Builds a fresh, uninitialized handler
pub type HandlerFactory = Box<dyn Fn() -> Box<dyn MiniGameHandler>>;

#[derive(Default)]
pub struct HandlerRegistry {
    classes: AHashMap<String, HandlerFactory>,
    defaults: AHashMap<Tag, String>,
}

impl HandlerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the six built-in mechanics wired to their type tags
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_class(ManipulationHandler::CLASS_NAME, || {
            Box::new(ManipulationHandler::new())
        });
        registry.register_class(SweetspotHandler::CLASS_NAME, || Box::new(SweetspotHandler::new()));
        registry.register_class(SequenceHandler::CLASS_NAME, || Box::new(SequenceHandler::new()));
        registry.register_class(TimingHandler::CLASS_NAME, || Box::new(TimingHandler::new()));
        registry.register_class(CalibrationHandler::CLASS_NAME, || {
            Box::new(CalibrationHandler::new())
        });
        registry.register_class(TemperatureHandler::CLASS_NAME, || {
            Box::new(TemperatureHandler::new())
        });

        registry.set_default_class(tags::minigame_type::manipulation(), ManipulationHandler::CLASS_NAME);
        registry.set_default_class(tags::minigame_type::lockpick(), SweetspotHandler::CLASS_NAME);
        registry.set_default_class(tags::minigame_type::sequence(), SequenceHandler::CLASS_NAME);
        registry.set_default_class(tags::minigame_type::timing(), TimingHandler::CLASS_NAME);
        registry.set_default_class(tags::minigame_type::calibration(), CalibrationHandler::CLASS_NAME);
        registry.set_default_class(tags::minigame_type::temperature(), TemperatureHandler::CLASS_NAME);
        registry
    }

    pub fn register_class<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn MiniGameHandler> + 'static,
    {
        self.classes.insert(name.to_string(), Box::new(factory));
    }

    pub fn set_default_class(&mut self, type_tag: Tag, class: &str) {
        self.defaults.insert(type_tag, class.to_string());
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Class a definition resolves to: explicit override first, then the
    /// type's default.
    pub fn class_for<'a>(&'a self, definition: &'a MiniGameDefinition) -> Option<&'a str> {
        definition
            .handler_class
            .as_deref()
            .or_else(|| self.defaults.get(&definition.type_tag).map(String::as_str))
    }

    /// Construct the handler for a definition
    pub fn spawn(&self, definition: &MiniGameDefinition) -> Result<Box<dyn MiniGameHandler>> {
        let class = self.class_for(definition).ok_or_else(|| {
            MiniGameError::HandlerSpawnFailed(format!("no handler class for type {}", definition.type_tag))
        })?;
        let factory = self
            .classes
            .get(class)
            .ok_or_else(|| MiniGameError::HandlerSpawnFailed(format!("unknown handler class {}", class)))?;
        Ok(factory())
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut classes: Vec<_> = self.classes.keys().collect();
        classes.sort();
        f.debug_struct("HandlerRegistry")
            .field("classes", &classes)
            .field("defaults", &self.defaults.len())
            .finish()
    }
}
