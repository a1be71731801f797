//! Nested type-parameter scopes used to re-resolve copied type variables

use apigraph_core::{ClassTypeItem, GraphError, Result, TypeItem, TypeParameterItem, TypeParameterOwner};

#[derive(Debug, Clone)]
struct Frame {
    owner: TypeParameterOwner,
    names: Vec<String>,
}

/// Chain of scopes, innermost last: global, enclosing classes, class,
/// callable.
#[derive(Debug, Clone, Default)]
pub struct TypeParameterScope {
    frames: Vec<Frame>,
}

impl TypeParameterScope {
    /// The outermost scope, which declares nothing.
    pub fn global() -> Self {
        TypeParameterScope::default()
    }

    pub fn push(&mut self, owner: TypeParameterOwner, type_parameters: &[TypeParameterItem]) {
        self.frames.push(Frame {
            owner,
            names: type_parameters.iter().map(|p| p.name.clone()).collect(),
        });
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Owner of the innermost declaration of `name`.
    pub fn resolve(&self, name: &str) -> Option<&TypeParameterOwner> {
        self.frames
            .iter()
            .rev()
            .find(|frame| frame.names.iter().any(|n| n == name))
            .map(|frame| &frame.owner)
    }

    /// Point every type variable in `ty` at its declaration. `context`
    /// names the item being copied for error messages.
    pub fn resolve_type(&self, ty: &mut TypeItem, context: &str) -> Result<()> {
        match ty {
            TypeItem::Primitive { .. } => Ok(()),
            TypeItem::Class(class) => self.resolve_class_type(class, context),
            TypeItem::Variable(variable) => {
                let owner = self
                    .resolve(&variable.name)
                    .ok_or_else(|| GraphError::UnresolvedTypeParameter {
                        name: variable.name.clone(),
                        context: context.to_string(),
                    })?;
                variable.owner = Some(owner.clone());
                Ok(())
            }
            TypeItem::Wildcard {
                extends_bound,
                super_bound,
                ..
            } => {
                if let Some(bound) = extends_bound {
                    self.resolve_type(bound, context)?;
                }
                if let Some(bound) = super_bound {
                    self.resolve_type(bound, context)?;
                }
                Ok(())
            }
            TypeItem::Array { component, .. } => self.resolve_type(component, context),
            TypeItem::Lambda {
                receiver,
                parameters,
                return_type,
                ..
            } => {
                if let Some(receiver) = receiver {
                    self.resolve_type(receiver, context)?;
                }
                for parameter in parameters {
                    self.resolve_type(parameter, context)?;
                }
                self.resolve_type(return_type, context)
            }
        }
    }

    pub fn resolve_class_type(&self, class: &mut ClassTypeItem, context: &str) -> Result<()> {
        if let Some(outer) = &mut class.outer {
            self.resolve_class_type(outer, context)?;
        }
        for argument in &mut class.arguments {
            self.resolve_type(argument, context)?;
        }
        Ok(())
    }

    /// Resolve the bounds of type parameters declared in the innermost
    /// frame. Bounds may refer to each other (`<T extends Comparable<T>>`).
    pub fn resolve_bounds(&self, type_parameters: &mut [TypeParameterItem], context: &str) -> Result<()> {
        for type_parameter in type_parameters {
            for bound in &mut type_parameter.bounds {
                self.resolve_type(bound, context)?;
            }
        }
        Ok(())
    }
}
