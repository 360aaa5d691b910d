//! The per-unit lowering engine. One `Generator` owns every cache of a
//! single generation call and is consumed by it.

use std::collections::{HashMap, HashSet};

use bytes::{BufMut, BytesMut};

use golower_core::bail_internal;
use golower_core::error::Result;
use golower_core::ir::{Dict, MemoryModel, NameId, Object, Position, TypeCache, TypeId, TypeKind};
use golower_core::tracing::debug;

use crate::helpers::{HelperSet, BOOL2INT};
use crate::mangle::Mangler;
use crate::optimizer::BlockOptimizer;
use crate::strings::StringPool;
use crate::types::TypeLowering;
use crate::unit::GoUnit;
use crate::{GenerateOptions, Qualifier};

pub(crate) const LOG_AREA: &str = "[golang-gen]";

const PACKAGE_CLAUSE: &[u8] = b"package golower\n";

pub(crate) struct Generator<'a, 'q> {
    pub(crate) dict: &'a Dict,
    pub(crate) types: &'a TypeCache,
    pub(crate) objects: &'a [Object],
    pub(crate) options: &'a GenerateOptions,
    pub(crate) lowering: TypeLowering<'a>,
    pub(crate) mangler: Mangler,
    pub(crate) helpers: HelperSet,
    pub(crate) strings: StringPool,
    pub(crate) unit: GoUnit,
    /// Nesting depth of compound stores whose address is bound to `p`.
    pub(crate) dup_depth: usize,
    /// Names of the unit's objects; function-scope locals must not take them.
    pub(crate) object_names: HashSet<NameId>,
    qualifier: &'q mut dyn Qualifier,
    builtins: HashMap<usize, Option<String>>,
}

impl<'a, 'q> Generator<'a, 'q> {
    pub(crate) fn new(
        dict: &'a Dict,
        types: &'a TypeCache,
        objects: &'a [Object],
        model: &'a dyn MemoryModel,
        options: &'a GenerateOptions,
        qualifier: &'q mut dyn Qualifier,
    ) -> Self {
        Self {
            dict,
            types,
            objects,
            options,
            lowering: TypeLowering::new(types, model),
            mangler: Mangler::new(),
            helpers: HelperSet::new(),
            strings: StringPool::new(model.malloc_align()),
            unit: GoUnit::default(),
            dup_depth: 0,
            object_names: objects.iter().map(Object::name).collect(),
            qualifier,
            builtins: HashMap::new(),
        }
    }

    /// Lower every object, then append the helpers and the string pool.
    pub(crate) fn run(mut self) -> Result<Vec<u8>> {
        let objects = self.objects;
        for (index, object) in objects.iter().enumerate() {
            let name = self.display_name(object.name());
            debug!("{} object {} {}", LOG_AREA, index, name);
            let lowered = match object {
                Object::Function(definition) => self.function_definition(index, definition),
                Object::Data(definition) => self.data_definition(definition),
            };
            lowered.map_err(|err| err.in_object(name))?;
        }

        let mut unit = std::mem::take(&mut self.unit);
        unit.push_text(BOOL2INT);
        for helper in self.helpers.render(&mut self.lowering)? {
            unit.push_text(helper);
        }
        if let Some(pool) = self.strings.render() {
            for text in pool {
                unit.push_text(text);
            }
        }
        debug!(
            "{} {} helpers, {} strings in {} pool bytes, {} names",
            LOG_AREA,
            self.helpers.len(),
            self.strings.len(),
            self.strings.bytes().len(),
            self.mangler.len()
        );

        BlockOptimizer::new().run(&mut unit)?;

        let mut out = BytesMut::with_capacity(PACKAGE_CLAUSE.len() + 4096);
        out.put_slice(PACKAGE_CLAUSE);
        unit.render_into(&mut out);
        Ok(out.split_off(PACKAGE_CLAUSE.len()).to_vec())
    }

    pub(crate) fn object(&self, index: usize) -> Result<&'a Object> {
        match self.objects.get(index) {
            Some(object) => Ok(object),
            None => bail_internal!("reference to object {index} outside the unit"),
        }
    }

    /// Runtime package qualifier of a builtin stub, asked for once per index.
    pub(crate) fn builtin(&mut self, index: usize) -> Result<Option<String>> {
        if let Some(cached) = self.builtins.get(&index) {
            return Ok(cached.clone());
        }
        let qualifier = match self.object(index)? {
            Object::Function(definition) if definition.is_builtin_stub() => {
                Some(self.qualifier.qualify(definition))
            }
            _ => None,
        };
        self.builtins.insert(index, qualifier.clone());
        Ok(qualifier)
    }

    pub(crate) fn is_main(&self, name: NameId) -> Result<bool> {
        Ok(&*self.dict.name_bytes(name)? == b"main")
    }

    /// Go name of the object at `index`, qualified when it is a builtin.
    pub(crate) fn object_name(&mut self, index: usize) -> Result<String> {
        let object = self.object(index)?;
        let name = self.mangler.mangle(
            self.dict,
            object.name(),
            object.linkage().is_external(),
            None,
        )?;
        Ok(match self.builtin(index)? {
            Some(qualifier) if !qualifier.is_empty() => format!("{qualifier}.{name}"),
            _ => name,
        })
    }

    pub(crate) fn kind(&self, id: TypeId) -> Result<TypeKind> {
        self.types.kind(id)
    }

    pub(crate) fn is_void_pointer(&self, id: TypeId) -> bool {
        self.types.is_void_pointer(id)
    }

    /// Pointer to a non-function, non-void target.
    pub(crate) fn is_data_pointer(&self, id: TypeId) -> Result<bool> {
        Ok(self.types.is_pointer(id)?
            && !self.types.is_void_pointer(id)
            && !self.types.is_function_pointer(id)?)
    }

    pub(crate) fn signature(&mut self, id: TypeId) -> Result<String> {
        self.lowering.signature(id)
    }

    pub(crate) fn position_comment(&self, position: &Position) -> Option<String> {
        if self.options.emit_positions && position.line != 0 {
            Some(position.short().to_string())
        } else {
            None
        }
    }

    fn display_name(&self, name: NameId) -> String {
        match self.dict.name_bytes(name) {
            Ok(bytes) if !bytes.is_empty() => String::from_utf8_lossy(&bytes).into_owned(),
            _ => format!("#{name}"),
        }
    }
}
