//! # Reference Backend
//!
//! The built-in `reference` backend. It keeps its configuration and adds
//! integers. An optional `"delay_ms"` key makes every sum sleep first.

use std::time::Duration;

use alpharpc::Engine;
use serde_json::Value;

use crate::backend::Backend;
use crate::backend::BackendType;
use crate::error::Error;
use crate::error::Result;

pub struct ReferenceBackend {
    config: Value,
    delay: Option<Duration>,
}

impl ReferenceBackend {
    pub const NAME: &'static str = "reference";

    pub(crate) fn from_config(config: &Value) -> Result<Self> {
        if !config.is_object() {
            return Err(Error::ConfigParse(format!(
                "{} backend expects a JSON object, got {}",
                Self::NAME,
                config
            )));
        }

        let delay = match config.get("delay_ms") {
            None => None,
            Some(value) => {
                let ms = value.as_u64().ok_or_else(|| {
                    Error::ConfigParse(format!("delay_ms must be a non-negative integer, got {}", value))
                })?;
                Some(Duration::from_millis(ms))
            }
        };

        Ok(Self {
            config: config.clone(),
            delay,
        })
    }
}

impl Backend for ReferenceBackend {
    fn get_config(&self) -> String {
        self.config.to_string()
    }

    fn compute_sum(&self, x: i32, y: i32) -> Result<i32> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        x.checked_add(y)
            .ok_or_else(|| Error::OperationFailed(format!("{} + {} overflows i32", x, y)))
    }

    fn destroy(&self) -> Result<bool> {
        Ok(true)
    }
}

impl BackendType for ReferenceBackend {
    fn create(_engine: &Engine, config: &Value) -> anyhow::Result<Self> {
        Ok(Self::from_config(config)?)
    }

    fn open(_engine: &Engine, config: &Value) -> anyhow::Result<Self> {
        Ok(Self::from_config(config)?)
    }
}
