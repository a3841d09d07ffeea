//! # Validation Hand-off
//!
//! The document model does not know any schema. After a structural edit it
//! exposes what a validator needs to judge the change: the serialized markup
//! of the affected passage and the attributes of the element involved.
//! Validators plug in through [`MarkupValidator`]; their findings are
//! returned to the caller untouched.

use crate::events::DocumentEvent;
use crate::ids::PassageId;
use crate::state::DocumentState;
use scriptorium_markup::{serialize, Attributes, TagId};
use serde::Serialize;

/// Element touched by the latest structural edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedElement {
    pub tag_id: TagId,
    pub name: String,
    pub attributes: Attributes,
}

/// What a validator sees of a structural edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationView {
    pub passage_id: PassageId,
    /// Serialized markup of the whole passage after the edit
    pub markup: String,
    /// `None` when the edit removed the element
    pub element: Option<ChangedElement>,
}

impl ValidationView {
    /// View of the change `event` made, read from the state after it
    pub(crate) fn for_event(event: &DocumentEvent, state: &DocumentState) -> Option<Self> {
        let (passage_id, element) = match event {
            DocumentEvent::TagAdded {
                passage_id, tag_id, ..
            } => {
                let tag = state.tag(tag_id)?;
                let element = ChangedElement {
                    tag_id: tag.id.clone(),
                    name: tag.tag_type.clone(),
                    attributes: tag.attributes.clone(),
                };
                (passage_id, Some(element))
            }
            DocumentEvent::TagRemoved { passage_id, .. } => (passage_id, None),
            _ => return None,
        };

        let passage = state.passage(passage_id)?;
        Some(Self {
            passage_id: passage.id.clone(),
            markup: serialize(&passage.root),
            element,
        })
    }
}

/// External validator
pub trait MarkupValidator {
    type Diagnostic;

    fn validate(&self, view: &ValidationView) -> Vec<Self::Diagnostic>;
}

impl<F, D> MarkupValidator for F
where
    F: Fn(&ValidationView) -> Vec<D>,
{
    type Diagnostic = D;

    fn validate(&self, view: &ValidationView) -> Vec<D> {
        self(view)
    }
}
