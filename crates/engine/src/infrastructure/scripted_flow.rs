//! Non-interactive flow adapter that answers from a prepared list of choices.

use std::collections::HashMap;

use async_trait::async_trait;
use heroes_domain::{AdvancementId, AdvancementInput};
use serde::{Deserialize, Serialize};

use crate::use_cases::advancement::{FlowPort, FlowRequest, FlowResponse};

/// One prepared answer, as read from a choices file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptedChoice {
    pub advancement_id: AdvancementId,
    pub level: u32,
    pub input: AdvancementInput,
}

/// Answers each request with the choice prepared for its advancement and
/// level, falling back to the previous choice when there is one.
///
/// Cancels the workflow when it has no answer or when its answer was
/// rejected, since asking again would return the same input.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFlow {
    choices: HashMap<(AdvancementId, u32), AdvancementInput>,
}

impl ScriptedFlow {
    pub fn new(choices: impl IntoIterator<Item = ScriptedChoice>) -> Self {
        Self {
            choices: choices
                .into_iter()
                .map(|choice| ((choice.advancement_id, choice.level), choice.input))
                .collect(),
        }
    }

    pub fn with_choice(
        mut self,
        advancement_id: AdvancementId,
        level: u32,
        input: AdvancementInput,
    ) -> Self {
        self.choices.insert((advancement_id, level), input);
        self
    }
}

#[async_trait]
impl FlowPort for ScriptedFlow {
    async fn request(&self, request: FlowRequest) -> FlowResponse {
        if let Some(error) = &request.error {
            tracing::warn!(
                advancement_id = %request.advancement.id,
                level = request.level,
                error = %error,
                "Scripted choice rejected"
            );
            return FlowResponse::Cancel;
        }

        let input = self
            .choices
            .get(&(request.advancement.id, request.level))
            .or_else(|| request.previous_choice());
        match input {
            Some(input) => FlowResponse::Submit(input.clone()),
            None => {
                tracing::warn!(
                    item = %request.item_name,
                    advancement = %request.advancement.title,
                    level = request.level,
                    "No scripted choice for advancement"
                );
                FlowResponse::Cancel
            }
        }
    }
}
