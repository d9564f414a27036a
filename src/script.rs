//! Static call scripts for each agent type
//!
//! Every script walks `greeting -> questions (in order) -> closing`. The
//! primary script has no questions: it classifies the caller and transfers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prompt spoken once a script has nothing left to ask
pub const CONTINUATION_PROMPT: &str = "Is there anything else I can help you with?";

/// Prompt spoken when the primary agent cannot classify the caller
pub const INTENT_CLARIFICATION: &str = "I want to make sure I get you to the right person. \
     Are you calling about a vehicle breakdown, a driving job, or a general question about our services?";

/// Greeting used when no script matches the requested agent type
pub const FALLBACK_GREETING: &str = "Hello! How can I help you today?";

// ============================================================================
// Agent types and steps
// ============================================================================

/// The agents a caller can be routed between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AgentType {
    #[default]
    Primary,
    Breakdown,
    JobApplication,
    General,
    /// Stand-in for an unrecognized agent name
    Fallback,
}

impl AgentType {
    /// Agents that can be requested by name
    pub const ALL: [AgentType; 4] = [
        AgentType::Primary,
        AgentType::Breakdown,
        AgentType::JobApplication,
        AgentType::General,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AgentType::Primary => "primary",
            AgentType::Breakdown => "breakdown",
            AgentType::JobApplication => "job-application",
            AgentType::General => "general",
            AgentType::Fallback => "fallback",
        }
    }

    /// Resolve a requested agent name, using the fallback agent for unknown names
    pub fn resolve(name: &str) -> AgentType {
        name.parse().unwrap_or(AgentType::Fallback)
    }

    /// Everything but primary walks its script; primary only routes
    pub fn is_specialized(self) -> bool {
        !matches!(self, AgentType::Primary)
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown agent type name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown agent type: {0}")]
pub struct UnknownAgentType(pub String);

impl FromStr for AgentType {
    type Err = UnknownAgentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentType::ALL
            .into_iter()
            .find(|agent| agent.as_str() == s)
            .ok_or_else(|| UnknownAgentType(s.to_string()))
    }
}

/// A named position in a script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Greeting,
    // breakdown
    SafetyCheck,
    Location,
    VehicleInfo,
    ProblemDescription,
    // job-application
    Experience,
    License,
    Availability,
    // general
    Company,
    InquiryType,
    ServiceDetails,
    Closing,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Greeting => "greeting",
            Step::SafetyCheck => "safety_check",
            Step::Location => "location",
            Step::VehicleInfo => "vehicle_info",
            Step::ProblemDescription => "problem_description",
            Step::Experience => "experience",
            Step::License => "license",
            Step::Availability => "availability",
            Step::Company => "company",
            Step::InquiryType => "inquiry_type",
            Step::ServiceDetails => "service_details",
            Step::Closing => "closing",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Script records
// ============================================================================

/// A question asked on entering `step`; the reply is stored under `key`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Question {
    pub step: Step,
    pub key: &'static str,
    pub text: &'static str,
}

/// A named set of phrases spoken when handing off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub name: &'static str,
    pub phrases: &'static [&'static str],
}

/// Immutable per-agent dialogue script
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Script {
    pub agent_type: AgentType,
    pub greetings: &'static [&'static str],
    /// Collected-data key for the caller's reply to the greeting
    pub greeting_key: Option<&'static str>,
    pub questions: &'static [Question],
    pub transitions: &'static [Transition],
    pub closings: &'static [&'static str],
}

impl Script {
    /// Full step sequence: greeting, each question step, closing
    pub fn steps(&self) -> Vec<Step> {
        std::iter::once(Step::Greeting)
            .chain(self.questions.iter().map(|q| q.step))
            .chain(std::iter::once(Step::Closing))
            .collect()
    }

    pub fn contains_step(&self, step: Step) -> bool {
        matches!(step, Step::Greeting | Step::Closing) || self.question(step).is_some()
    }

    pub fn question(&self, step: Step) -> Option<&Question> {
        self.questions.iter().find(|q| q.step == step)
    }

    /// The step after `step`, or `None` on closing (or a foreign step)
    pub fn next_step(&self, step: Step) -> Option<Step> {
        let steps = self.steps();
        let pos = steps.iter().position(|s| *s == step)?;
        steps.get(pos + 1).copied()
    }

    /// Collected-data key for a reply given while on `step`
    pub fn data_key(&self, step: Step) -> Option<&'static str> {
        match step {
            Step::Greeting => self.greeting_key,
            Step::Closing => None,
            other => self.question(other).map(|q| q.key),
        }
    }

    pub fn transition(&self, name: &str) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.name == name)
    }
}

// ============================================================================
// Script table
// ============================================================================

static PRIMARY: Script = Script {
    agent_type: AgentType::Primary,
    greetings: &[
        "Thanks for calling Fleetline Logistics. How can I help you today?",
        "Fleetline Logistics, this is the front desk. What can I do for you?",
        "Hi, you've reached Fleetline Logistics. What are you calling about today?",
    ],
    greeting_key: None,
    questions: &[],
    transitions: &[
        Transition {
            name: "to_breakdown",
            phrases: &[
                "Sorry to hear that. Let me get you over to our breakdown team right away.",
                "Okay, I'm connecting you with roadside dispatch now. One moment.",
            ],
        },
        Transition {
            name: "to_job_application",
            phrases: &[
                "Great, let me transfer you to our recruiting team.",
                "Glad you're interested in driving with us. Connecting you to recruiting now.",
            ],
        },
        Transition {
            name: "to_general",
            phrases: &[
                "Sure, let me connect you with someone from customer service.",
                "No problem, transferring you to our customer service desk.",
            ],
        },
    ],
    closings: &["Thanks for calling Fleetline Logistics. Have a safe day."],
};

static BREAKDOWN: Script = Script {
    agent_type: AgentType::Breakdown,
    greetings: &[
        "Hi, this is roadside dispatch. Can I start with your name and the company you drive for?",
        "Breakdown desk, you're talking to dispatch. Who do I have on the line, and which carrier are you with?",
    ],
    greeting_key: Some("driver_name"),
    questions: &[
        Question {
            step: Step::SafetyCheck,
            key: "safety_status",
            text: "First things first. Are you and the vehicle safely off the road?",
        },
        Question {
            step: Step::Location,
            key: "location",
            text: "Where are you right now? A highway and mile marker or the nearest exit works.",
        },
        Question {
            step: Step::VehicleInfo,
            key: "vehicle_info",
            text: "What truck are you in? Give me the unit number and whether you're pulling a trailer.",
        },
        Question {
            step: Step::ProblemDescription,
            key: "problem_description",
            text: "Tell me what happened with the truck.",
        },
    ],
    transitions: &[],
    closings: &[
        "Thanks, I've got everything I need. A service truck is being dispatched and a technician will call you with an arrival time.",
        "Got it. I'm handing this to our road service team now, and they'll call you back shortly with an ETA. Stay safe.",
    ],
};

static JOB_APPLICATION: Script = Script {
    agent_type: AgentType::JobApplication,
    greetings: &[
        "Hi, this is Fleetline recruiting. Thanks for your interest! What's your name?",
        "Recruiting desk here. Happy to help you get started. Can I get your full name?",
    ],
    greeting_key: Some("applicant_name"),
    questions: &[
        Question {
            step: Step::Experience,
            key: "experience",
            text: "How many years of driving experience do you have, and what kind of freight have you hauled?",
        },
        Question {
            step: Step::License,
            key: "license_type",
            text: "What class of license do you hold, and do you have any endorsements?",
        },
        Question {
            step: Step::Availability,
            key: "availability",
            text: "When would you be available to start, and are you looking for local, regional, or over-the-road routes?",
        },
    ],
    transitions: &[],
    closings: &[
        "Thank you! I'm passing your details to a recruiter, and they'll reach out within two business days.",
        "That's everything for now. A recruiter will follow up with next steps soon. Thanks for calling.",
    ],
};

static GENERAL: Script = Script {
    agent_type: AgentType::General,
    greetings: &[
        "Hi, this is Fleetline customer service. May I have your name, please?",
        "Customer service, thanks for holding. Who am I speaking with?",
    ],
    greeting_key: Some("caller_name"),
    questions: &[
        Question {
            step: Step::Company,
            key: "company_name",
            text: "Which company are you calling from?",
        },
        Question {
            step: Step::InquiryType,
            key: "inquiry_type",
            text: "Is this about a quote, an existing shipment, or something else?",
        },
        Question {
            step: Step::ServiceDetails,
            key: "service_details",
            text: "Can you give me the details? Origin, destination, and freight type help if it's a shipment.",
        },
    ],
    transitions: &[],
    closings: &[
        "Thanks, I've noted all of that. Someone from our team will get back to you today.",
        "Perfect, I'm passing this along to the right person and they'll be in touch shortly.",
    ],
};

static FALLBACK: Script = Script {
    agent_type: AgentType::Fallback,
    greetings: &[FALLBACK_GREETING],
    greeting_key: None,
    questions: &[],
    transitions: &[],
    closings: &[CONTINUATION_PROMPT],
};

/// Script for an agent type
pub fn script_for(agent_type: AgentType) -> &'static Script {
    match agent_type {
        AgentType::Primary => &PRIMARY,
        AgentType::Breakdown => &BREAKDOWN,
        AgentType::JobApplication => &JOB_APPLICATION,
        AgentType::General => &GENERAL,
        AgentType::Fallback => &FALLBACK,
    }
}

/// Look up a script by agent type name, falling back to a generic script
pub fn get_script(name: &str) -> &'static Script {
    script_for(AgentType::resolve(name))
}

// ============================================================================
// Intent classification
// ============================================================================

const BREAKDOWN_KEYWORDS: &[&str] = &[
    "broke down",
    "broken down",
    "breakdown",
    "break down",
    "flat tire",
    "blowout",
    "won't start",
    "engine",
    "overheat",
    "tow",
    "accident",
    "stuck",
    "stranded",
    "brake",
    "leak",
];

const JOB_KEYWORDS: &[&str] = &[
    "job",
    "hiring",
    "apply",
    "application",
    "position",
    "career",
    "employment",
    "recruit",
    "work for",
    "drive for",
];

const GENERAL_KEYWORDS: &[&str] = &[
    "quote",
    "rate",
    "price",
    "pricing",
    "shipment",
    "shipping",
    "freight",
    "delivery",
    "invoice",
    "billing",
    "service",
    "question",
    "information",
];

/// Keyword sets in priority order; the first set with any match wins
const ROUTES: [(AgentType, &str, &[&str]); 3] = [
    (AgentType::Breakdown, "to_breakdown", BREAKDOWN_KEYWORDS),
    (AgentType::JobApplication, "to_job_application", JOB_KEYWORDS),
    (AgentType::General, "to_general", GENERAL_KEYWORDS),
];

/// A routing decision made by the primary agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub target: AgentType,
    /// Name of the primary script's transition phrase set
    pub transition: &'static str,
}

/// Classify a caller's utterance by substring keyword match.
///
/// Matching is plain `contains` over the lowercased text, so an utterance
/// that hits several sets resolves to breakdown, then job, then general.
pub fn classify(utterance: &str) -> Option<Route> {
    let lowered = utterance.to_lowercase();
    ROUTES
        .iter()
        .find(|(_, _, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(target, transition, _)| Route {
            target: *target,
            transition: *transition,
        })
}
