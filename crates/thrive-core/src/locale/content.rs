use time::OffsetDateTime;

use crate::model::{ManagedContent, SubscriptionTier};

use super::DEFAULT_LANGUAGE;

fn same_language(a: &str, b: &str) -> bool {
    let primary = |s: &str| s.trim().split(['-', '_']).next().unwrap_or_default().to_ascii_lowercase();
    primary(a) == primary(b)
}

/// Picks the managed content a user should see right now.
///
/// Items must be live and target the tier. Items in the requested language win;
/// when none exist the English items are used instead. Highest priority first,
/// then newest.
pub fn select_managed_content<'a>(
    items: &'a [ManagedContent],
    language: &str,
    tier: SubscriptionTier,
    now: OffsetDateTime,
) -> Vec<&'a ManagedContent> {
    let eligible: Vec<&ManagedContent> = items
        .iter()
        .filter(|item| item.is_live(now) && item.targets(tier))
        .collect();

    let mut selected: Vec<&ManagedContent> = eligible
        .iter()
        .copied()
        .filter(|item| same_language(&item.language, language))
        .collect();
    if selected.is_empty() && !same_language(language, DEFAULT_LANGUAGE) {
        selected = eligible
            .into_iter()
            .filter(|item| same_language(&item.language, DEFAULT_LANGUAGE))
            .collect();
    }

    selected.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContentKind;
    use time::Duration;
    use time::macros::datetime;
    use uuid::Uuid;

    fn item(title: &str, language: &str, priority: i32) -> ManagedContent {
        ManagedContent {
            id: Uuid::new_v4(),
            kind: ContentKind::Tip,
            title: title.to_string(),
            body: String::new(),
            language: language.to_string(),
            target_tiers: Vec::new(),
            priority,
            active: true,
            valid_from: datetime!(2025-01-01 0:00 UTC),
            valid_until: None,
            created_at: datetime!(2025-01-01 0:00 UTC),
        }
    }

    fn titles(items: Vec<&ManagedContent>) -> Vec<&str> {
        items.into_iter().map(|i| i.title.as_str()).collect()
    }

    #[test]
    fn filters_and_orders() {
        let now = datetime!(2025-03-01 12:00 UTC);
        let mut premium_only = item("premium", "de", 5);
        premium_only.target_tiers = vec![SubscriptionTier::Premium];
        let mut expired = item("expired", "de", 9);
        expired.valid_until = Some(now - Duration::days(1));
        let mut inactive = item("inactive", "de", 9);
        inactive.active = false;
        let mut future = item("future", "de", 9);
        future.valid_from = now + Duration::hours(1);
        let mut newer = item("newer", "de", 1);
        newer.created_at = datetime!(2025-02-01 0:00 UTC);

        let items = vec![
            item("older", "de", 1),
            premium_only,
            expired,
            inactive,
            future,
            newer,
            item("english", "en", 3),
        ];

        assert_eq!(
            titles(select_managed_content(&items, "de-AT", SubscriptionTier::Free, now)),
            vec!["newer", "older"]
        );
        assert_eq!(
            titles(select_managed_content(&items, "de", SubscriptionTier::Premium, now)),
            vec!["premium", "newer", "older"]
        );
    }

    #[test]
    fn falls_back_to_english() {
        let now = datetime!(2025-03-01 12:00 UTC);
        let items = vec![item("hallo", "de", 1), item("hello", "en", 1)];
        assert_eq!(
            titles(select_managed_content(&items, "ja", SubscriptionTier::Free, now)),
            vec!["hello"]
        );
        assert!(select_managed_content(&[], "ja", SubscriptionTier::Free, now).is_empty());
    }
}
