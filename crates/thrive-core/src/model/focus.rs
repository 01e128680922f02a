use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

string_enum! {
    pub enum FocusStatus ("status") {
        Active => "active",
        Completed => "completed",
        Abandoned => "abandoned",
    }
}

/// Built-in focus/break rhythm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub focus_minutes: u32,
    pub break_minutes: u32,
    pub description: &'static str,
}

const TEMPLATES: &[FocusTemplate] = &[
    FocusTemplate {
        id: "pomodoro",
        name: "Pomodoro",
        focus_minutes: 25,
        break_minutes: 5,
        description: "Classic 25 minute sprint followed by a short break",
    },
    FocusTemplate {
        id: "deep-work",
        name: "Deep Work",
        focus_minutes: 90,
        break_minutes: 15,
        description: "One long uninterrupted block for demanding work",
    },
    FocusTemplate {
        id: "short-burst",
        name: "Short Burst",
        focus_minutes: 15,
        break_minutes: 3,
        description: "Quick session to get started on something you are avoiding",
    },
    FocusTemplate {
        id: "desk-time",
        name: "DeskTime 52/17",
        focus_minutes: 52,
        break_minutes: 17,
        description: "52 minutes of focus and a 17 minute recharge",
    },
];

pub fn focus_templates() -> &'static [FocusTemplate] {
    TEMPLATES
}

pub fn focus_template(id: &str) -> Option<&'static FocusTemplate> {
    TEMPLATES.iter().find(|t| t.id == id)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusSession {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    pub planned_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_minutes: Option<u32>,
    pub status: FocusStatus,
    #[serde(default)]
    pub interruptions: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub ended_at: Option<OffsetDateTime>,
}

impl FocusSession {
    /// Whole minutes actually spent: the reported value when given, otherwise
    /// elapsed wall time. Clamped to `1..=2 * planned`.
    pub fn resolve_actual_minutes(&self, reported: Option<u32>, now: OffsetDateTime) -> u32 {
        let elapsed = (now - self.started_at).whole_minutes().max(0) as u32;
        let minutes = reported.unwrap_or(elapsed);
        minutes.clamp(1, self.planned_minutes.max(1) * 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn session(planned: u32, started_at: OffsetDateTime) -> FocusSession {
        FocusSession {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            task_id: None,
            template_id: None,
            planned_minutes: planned,
            actual_minutes: None,
            status: FocusStatus::Active,
            interruptions: 0,
            started_at,
            ended_at: None,
        }
    }

    #[test]
    fn templates_are_addressable() {
        assert_eq!(focus_template("pomodoro").map(|t| t.focus_minutes), Some(25));
        assert!(focus_template("nap").is_none());
        assert_eq!(focus_templates().len(), 4);
    }

    #[test]
    fn actual_minutes_from_elapsed_time() {
        let now = OffsetDateTime::now_utc();
        let s = session(25, now - Duration::minutes(27));
        assert_eq!(s.resolve_actual_minutes(None, now), 27);
    }

    #[test]
    fn actual_minutes_are_clamped() {
        let now = OffsetDateTime::now_utc();
        let s = session(25, now);
        assert_eq!(s.resolve_actual_minutes(None, now), 1);
        assert_eq!(s.resolve_actual_minutes(Some(500), now), 50);
        assert_eq!(s.resolve_actual_minutes(Some(20), now), 20);
    }
}
