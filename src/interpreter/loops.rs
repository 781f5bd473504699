// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::interpreter::{type_mismatch, Flow, Interpreter};
use crate::lexer::Span;
use crate::types::NodeId;
use crate::value::Value;

use anyhow::Result;

impl Interpreter<'_> {
    /// `collection.forEach((item, index) => { ... })`.
    ///
    /// Iterates the snapshot taken when the collection was read, so edits made
    /// by the body do not affect which members are visited. A `return` inside
    /// the body ends the whole projection.
    pub(super) fn eval_for_each(
        &mut self,
        span: &Span,
        items: Vec<NodeId>,
        params: &[Ref<Expr>],
    ) -> Result<Flow> {
        let (lambda_params, body) = match params {
            [lambda] => match lambda.as_ref() {
                Expr::Lambda { params, body, .. } => (params, body),
                _ => return Err(type_mismatch(lambda.span(), "forEach expects a lambda")),
            },
            _ => return Err(type_mismatch(span, "forEach expects exactly one lambda")),
        };

        for (idx, item) in items.into_iter().enumerate() {
            self.activation_mut()?.push_frame();
            if let Some(p) = lambda_params.first() {
                self.activation_mut()?
                    .bind(p.source_str(), Value::Type(item))?;
            }
            if let Some(p) = lambda_params.get(1) {
                self.activation_mut()?
                    .bind(p.source_str(), Value::Number(idx as f64))?;
            }
            let flow = self.eval_block(body);
            self.activation_mut()?.pop_frame()?;
            if flow? == Flow::Return {
                return Ok(Flow::Return);
            }
        }
        Ok(Flow::Continue)
    }
}
