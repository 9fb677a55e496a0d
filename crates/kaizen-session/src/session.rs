use kaizen_core::checkin::{CheckinSelection, Onboarding};
use kaizen_types::callbacks::ResearchDepth;
use serde::{Deserialize, Serialize};

/// What the bot is waiting for from a user. One slot per user: starting a
/// new flow replaces whatever was pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Session {
    Onboarding(Onboarding),
    /// `/addtask` was sent without a name; the next text is the name.
    AddingTask,
    Checkin(CheckinSelection),
    Automation(AutomationStep),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationStep {
    AwaitingResearchTopic,
    AwaitingResearchDepth {
        topic: String,
    },
    AwaitingSaveTarget {
        topic: String,
        depth: ResearchDepth,
        report: String,
        citations: Vec<String>,
    },
    AwaitingScrapeUrl,
    AwaitingEventSummary,
    AwaitingEventStart {
        summary: String,
    },
}

impl Session {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Onboarding(_) => "onboarding",
            Self::AddingTask => "adding_task",
            Self::Checkin(_) => "checkin",
            Self::Automation(_) => "automation",
        }
    }

    /// The open checklist, if the user is mid check-in.
    pub fn as_checkin(&self) -> Option<&CheckinSelection> {
        match self {
            Self::Checkin(selection) => Some(selection),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaizen_core::checkin::TaskRef;

    #[test]
    fn json_keeps_the_kind_tag() {
        let mut selection = CheckinSelection::new(
            3,
            "Dojo",
            vec![TaskRef {
                id: 1,
                name: "Read".into(),
            }],
        );
        selection.toggle(1).unwrap();
        let session = Session::Checkin(selection);

        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["kind"], "checkin");

        let back: Session = serde_json::from_value(json).unwrap();
        assert_eq!(back, session);
        assert!(back.as_checkin().unwrap().is_done(1));
    }

    #[test]
    fn unit_and_nested_variants_parse() {
        let adding: Session = serde_json::from_str(r#"{"kind":"adding_task"}"#).unwrap();
        assert_eq!(adding, Session::AddingTask);

        let step = Session::Automation(AutomationStep::AwaitingResearchDepth {
            topic: "sleep".into(),
        });
        let text = serde_json::to_string(&step).unwrap();
        assert_eq!(serde_json::from_str::<Session>(&text).unwrap(), step);
        assert_eq!(step.kind(), "automation");
    }
}
