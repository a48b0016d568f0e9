//! Consultation scenarios
//!
//! A scenario is picked before connecting and shapes the instructions the
//! assistant receives for the whole session.

use crate::locale;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Practice scenario for a live consultation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    #[default]
    InitialConsultation,
    WitnessPreparation,
    SettlementNegotiation,
    CourtroomPractice,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::InitialConsultation,
        Scenario::WitnessPreparation,
        Scenario::SettlementNegotiation,
        Scenario::CourtroomPractice,
    ];

    /// Stable tag used in storage and on the command line
    pub fn tag(&self) -> &'static str {
        match self {
            Scenario::InitialConsultation => "initial_consultation",
            Scenario::WitnessPreparation => "witness_preparation",
            Scenario::SettlementNegotiation => "settlement_negotiation",
            Scenario::CourtroomPractice => "courtroom_practice",
        }
    }

    fn role_brief(&self) -> &'static str {
        match self {
            Scenario::InitialConsultation => {
                "You are an experienced attorney holding a first consultation with a prospective client. \
                 Ask focused questions to establish the facts, the timeline, the parties involved and the \
                 remedy the client is seeking. Explain the relevant legal concepts in plain language."
            }
            Scenario::WitnessPreparation => {
                "You are a litigation attorney preparing the user to testify as a witness. Walk them through \
                 likely direct and cross-examination questions, one at a time, and coach them to answer \
                 truthfully, briefly and calmly."
            }
            Scenario::SettlementNegotiation => {
                "You are opposing counsel in a settlement negotiation. Negotiate firmly but professionally, \
                 make realistic offers and counteroffers, and respond to the user's arguments on their merits."
            }
            Scenario::CourtroomPractice => {
                "You are a judge presiding over a hearing in which the user presents their argument. Ask \
                 pointed questions from the bench, request supporting authority and keep the user on topic."
            }
        }
    }

    /// Instructions sent to the realtime assistant when the session starts
    pub fn instructions(&self, locale_code: &str) -> String {
        let language = locale::language_name(locale_code);
        format!(
            "{} Keep each reply short enough to be spoken aloud. You MUST respond in {}. \
             Remind the user once, at the start, that this is general legal information and not \
             a substitute for advice from a licensed attorney in their jurisdiction.",
            self.role_brief(),
            language
        )
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scenario::InitialConsultation => write!(f, "Initial consultation"),
            Scenario::WitnessPreparation => write!(f, "Witness preparation"),
            Scenario::SettlementNegotiation => write!(f, "Settlement negotiation"),
            Scenario::CourtroomPractice => write!(f, "Courtroom practice"),
        }
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.tag() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Scenario::ALL.iter().map(|s| s.tag()).collect();
                format!("unknown scenario '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}
