//! Memoized synthesis of runtime conversion routines.
//!
//! A compatible-with-conversion verdict means two types share structure but
//! not representation; assigning across them calls a synthesized
//! `convert(to, from) -> bool` routine. The registry hands out routine names
//! and guarantees each distinct `(from, to, for_value)` triple is synthesized
//! and emitted exactly once per compilation unit, even when conversions of
//! mutually-referencing element types re-enter the registry mid-synthesis.


use indexmap::IndexMap;
use tessera_core::{Field, TypeId, TypeKind, TypeTable};

use crate::{Error, Result};

/// Receives each synthesized routine body. Called at most once per key.
pub trait CodeSink {
    fn emit_function_body(&mut self, name: &str, body: &str);
}

/// Identity of one conversion routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversionKey {
    pub from: TypeId,
    pub to: TypeId,
    /// Value conversion or template conversion; the bodies differ.
    pub for_value: bool,
}

#[derive(Debug)]
struct ConversionFunction {
    name: String,
    body_emitted: bool,
}

/// How a source aggregate's components are addressed.
enum SourceShape<'t> {
    /// Named fields or alternatives, addressed by name.
    Named(&'t [Field]),
    /// List-like, addressed by position; carries the element type.
    Listed(TypeId),
}

/// Registry of synthesized conversion routines for one compilation unit.
///
/// Entries are never evicted; a key registered once keeps its name for the
/// lifetime of the registry.
pub struct ConversionRegistry<'t> {
    table: &'t TypeTable,
    functions: IndexMap<ConversionKey, ConversionFunction>,
}

impl<'t> ConversionRegistry<'t> {
    pub fn new(table: &'t TypeTable) -> Self {
        Self {
            table,
            functions: IndexMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Whether the routine for this triple has reached the sink. In-flight
    /// registrations (name handed out, body still being built) return false.
    pub fn is_emitted(&self, from: TypeId, to: TypeId, for_value: bool) -> bool {
        let key = ConversionKey {
            from: self.table.resolve_alias(from),
            to: self.table.resolve_alias(to),
            for_value,
        };
        self.functions.get(&key).is_some_and(|f| f.body_emitted)
    }

    /// Name of the routine converting `from` into `to`, synthesizing it on
    /// first demand.
    ///
    /// The name is registered before the body is built, so recursive
    /// conversions between mutually-referencing element types resolve to the
    /// in-flight routine instead of re-entering synthesis.
    pub fn get_or_create_conversion(
        &mut self,
        from: TypeId,
        to: TypeId,
        for_value: bool,
        sink: &mut dyn CodeSink,
    ) -> Result<String> {
        let key = ConversionKey {
            from: self.table.resolve_alias(from),
            to: self.table.resolve_alias(to),
            for_value,
        };
        if let Some(function) = self.functions.get(&key) {
            return Ok(function.name.clone());
        }

        let suffix = if for_value { "" } else { "_tmpl" };
        let name = format!(
            "conv_{}_to_{}{}_{}",
            sanitize(self.table.name(key.from)),
            sanitize(self.table.name(key.to)),
            suffix,
            self.functions.len()
        );
        self.functions.insert(
            key,
            ConversionFunction {
                name: name.clone(),
                body_emitted: false,
            },
        );

        let body = match self.synthesize(key, sink) {
            Ok(body) => body,
            Err(err) => {
                self.functions.shift_remove(&key);
                return Err(err);
            }
        };
        sink.emit_function_body(&name, &body);
        self.functions
            .get_mut(&key)
            .expect("entry registered above")
            .body_emitted = true;

        Ok(name)
    }

    fn synthesize(&mut self, key: ConversionKey, sink: &mut dyn CodeSink) -> Result<String> {
        let table = self.table;
        let mut body = String::new();

        let bound = if key.for_value {
            "is_bound"
        } else {
            "is_defined"
        };
        body.push_str(&format!("if (!from.{bound}()) return false;\n"));

        match table.kind(key.to) {
            TypeKind::Record { fields } | TypeKind::Set { fields } => {
                body.push_str(&format!(
                    "if (from.size_of() != {}) return false;\n",
                    fields.len()
                ));
                for (i, field) in fields.iter().enumerate() {
                    self.convert_slot(
                        &mut body,
                        key,
                        &format!("to.{}", field.name),
                        field.ty,
                        Some(&field.name),
                        i,
                        sink,
                    )?;
                }
            }
            TypeKind::Array { element, dimension } => {
                let (element, size) = (*element, dimension.size);
                body.push_str(&format!("if (from.size_of() != {size}) return false;\n"));
                for i in 0..size as usize {
                    self.convert_slot(
                        &mut body,
                        key,
                        &format!("to.at({i})"),
                        element,
                        None,
                        i,
                        sink,
                    )?;
                }
            }
            TypeKind::RecordOf { element } | TypeKind::SetOf { element } => {
                let element = *element;
                let source_element = match self.source_shape(key.from)? {
                    SourceShape::Listed(src) => src,
                    // Named source fields all convert into the one element
                    // type, so handle them slot by slot instead of looping.
                    SourceShape::Named(fields) => {
                        for (i, field) in fields.iter().enumerate() {
                            self.convert_slot(
                                &mut body,
                                key,
                                &format!("to.at({i})"),
                                element,
                                Some(&field.name),
                                i,
                                sink,
                            )?;
                        }
                        body.push_str("return true;\n");
                        return Ok(body);
                    }
                };
                body.push_str("for (i in 0..from.size_of()) {\n");
                body.push_str(&format!("  if (!from.at(i).{bound}()) continue;\n"));
                if table.resolve_alias(source_element) == table.resolve_alias(element) {
                    body.push_str("  to.at(i) = from.at(i);\n");
                } else {
                    let inner =
                        self.get_or_create_conversion(source_element, element, key.for_value, sink)?;
                    body.push_str(&format!(
                        "  if (!{inner}(to.at(i), from.at(i))) return false;\n"
                    ));
                }
                body.push_str("}\n");
            }
            TypeKind::Choice { alternatives } | TypeKind::Anytype { alternatives } => {
                let source_alts = match self.source_shape(key.from)? {
                    SourceShape::Named(fields) => fields,
                    SourceShape::Listed(_) => {
                        return Err(self.unsupported(key.from));
                    }
                };
                body.push_str("switch (from.selection()) {\n");
                for alt in alternatives {
                    let Some(source) = source_alts.iter().find(|s| s.name == alt.name) else {
                        continue;
                    };
                    body.push_str(&format!("  case \"{}\":\n", alt.name));
                    let target = format!("to.{}", alt.name);
                    let src = format!("from.{}", alt.name);
                    if table.resolve_alias(source.ty) == table.resolve_alias(alt.ty) {
                        body.push_str(&format!("    {target} = {src};\n"));
                    } else {
                        let inner =
                            self.get_or_create_conversion(source.ty, alt.ty, key.for_value, sink)?;
                        body.push_str(&format!("    if (!{inner}({target}, {src})) return false;\n"));
                    }
                    body.push_str("    break;\n");
                }
                body.push_str("}\n");
            }
            TypeKind::Primitive(_) | TypeKind::Alias { .. } => {
                return Err(self.unsupported(key.to));
            }
        }

        body.push_str("return true;\n");
        Ok(body)
    }

    /// Populate one target slot from its matching source component.
    ///
    /// Named sources are matched by name when the target slot has one,
    /// positionally otherwise; list-like sources always by position.
    #[allow(clippy::too_many_arguments)]
    fn convert_slot(
        &mut self,
        body: &mut String,
        key: ConversionKey,
        target: &str,
        target_ty: TypeId,
        slot_name: Option<&str>,
        position: usize,
        sink: &mut dyn CodeSink,
    ) -> Result<()> {
        let (src, src_ty) = match self.source_shape(key.from)? {
            SourceShape::Named(fields) => {
                // Named sources are always addressed by name; the slot's own
                // name wins, the same-position field otherwise.
                let by_name = slot_name.and_then(|n| fields.iter().find(|f| f.name == n));
                match by_name.or_else(|| fields.get(position)) {
                    Some(field) => (format!("from.{}", field.name), field.ty),
                    // The runtime arity guard already rejects this case.
                    None => return Ok(()),
                }
            }
            SourceShape::Listed(element) => (format!("from.at({position})"), element),
        };

        let bound = if key.for_value {
            "is_bound"
        } else {
            "is_defined"
        };
        body.push_str(&format!("if ({src}.{bound}()) {{\n"));
        if self.table.resolve_alias(src_ty) == self.table.resolve_alias(target_ty) {
            body.push_str(&format!("  {target} = {src};\n"));
        } else {
            let inner = self.get_or_create_conversion(src_ty, target_ty, key.for_value, sink)?;
            body.push_str(&format!("  if (!{inner}({target}, {src})) return false;\n"));
        }
        body.push_str("}\n");
        Ok(())
    }

    fn source_shape(&self, id: TypeId) -> Result<SourceShape<'t>> {
        match self.table.kind(id) {
            TypeKind::Record { fields }
            | TypeKind::Set { fields }
            | TypeKind::Choice {
                alternatives: fields,
            }
            | TypeKind::Anytype {
                alternatives: fields,
            } => Ok(SourceShape::Named(fields)),
            TypeKind::Array { element, .. }
            | TypeKind::RecordOf { element }
            | TypeKind::SetOf { element } => Ok(SourceShape::Listed(*element)),
            TypeKind::Primitive(_) | TypeKind::Alias { .. } => Err(self.unsupported(id)),
        }
    }

    fn unsupported(&self, id: TypeId) -> Error {
        Error::UnsupportedType {
            operation: "conversion",
            kind: self.table.kind(id).describe(),
            name: self.table.name(id).to_string(),
        }
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
