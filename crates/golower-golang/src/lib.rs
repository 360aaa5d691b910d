//! Go backend: lowers an IR translation unit to Go source text.
//!
//! The output has no package clause and no imports; the caller wraps it in a
//! file that imports `unsafe`, `math` and the runtime support package.

mod defs;
mod expr;
mod generator;
mod values;

pub mod function;
pub mod graph;
pub mod helpers;
pub mod mangle;
pub mod optimizer;
pub mod strings;
pub mod types;
pub mod unit;

use std::io;

use tracing::error;

use golower_core::config;
use golower_core::error::Result;
use golower_core::ir::{Dict, FunctionDefinition, HostModel, MemoryModel, TranslationUnit};

use crate::generator::{Generator, LOG_AREA};

pub use crate::mangle::Mangler;
pub use crate::optimizer::{BlockOptimizer, BlockPass, BlockPassName, OptimizationReport};
pub use crate::types::TypeLowering;

/// Names the package that implements a builtin stub.
pub trait Qualifier {
    fn qualify(&mut self, definition: &FunctionDefinition) -> String;
}

impl<F> Qualifier for F
where
    F: FnMut(&FunctionDefinition) -> String,
{
    fn qualify(&mut self, definition: &FunctionDefinition) -> String {
        self(definition)
    }
}

/// Every builtin lives in one package.
#[derive(Debug, Clone)]
pub struct RuntimePackage(pub String);

impl Qualifier for RuntimePackage {
    fn qualify(&mut self, _definition: &FunctionDefinition) -> String {
        self.0.clone()
    }
}

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Panic with the error instead of returning it.
    pub panic_on_error: bool,
    /// Package of `Xstrncpy`, used for byte buffers initialized from strings.
    pub runtime_qualifier: String,
    /// Follow declarations with `// file:line:col`.
    pub emit_positions: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            panic_on_error: config::panic_on_error(),
            runtime_qualifier: "crt".to_string(),
            emit_positions: true,
        }
    }
}

pub struct GoBackend<'a> {
    dict: &'a Dict,
    model: Box<dyn MemoryModel>,
    options: GenerateOptions,
}

impl<'a> GoBackend<'a> {
    pub fn new(dict: &'a Dict) -> Self {
        Self {
            dict,
            model: Box::new(HostModel::default()),
            options: GenerateOptions::default(),
        }
    }

    pub fn with_model(mut self, model: impl MemoryModel + 'static) -> Self {
        self.model = Box::new(model);
        self
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    /// Go text for `unit`, or the first error. Nothing partial is returned.
    pub fn generate(
        &self,
        unit: &TranslationUnit,
        qualifier: &mut dyn Qualifier,
    ) -> Result<Vec<u8>> {
        let generator = Generator::new(
            self.dict,
            &unit.types,
            &unit.objects,
            &*self.model,
            &self.options,
            qualifier,
        );
        match generator.run() {
            Ok(text) => Ok(text),
            Err(err) => {
                error!("{} {}", LOG_AREA, err);
                if self.options.panic_on_error {
                    panic!("{err}");
                }
                Err(err)
            }
        }
    }

    /// [`generate`](Self::generate), written to `out` in one piece.
    pub fn write_to(
        &self,
        unit: &TranslationUnit,
        qualifier: &mut dyn Qualifier,
        out: &mut impl io::Write,
    ) -> Result<()> {
        let text = self.generate(unit, qualifier)?;
        out.write_all(&text)?;
        Ok(())
    }
}
