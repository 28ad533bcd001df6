use crate::models::chat::Conversation;
use chrono::{ DateTime, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc };
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecencyGroup {
    Today,
    Yesterday,
    Previous7Days,
    Older,
}

impl RecencyGroup {
    pub const ALL: [RecencyGroup; 4] = [
        RecencyGroup::Today,
        RecencyGroup::Yesterday,
        RecencyGroup::Previous7Days,
        RecencyGroup::Older,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RecencyGroup::Today => "Today",
            RecencyGroup::Yesterday => "Yesterday",
            RecencyGroup::Previous7Days => "Previous 7 Days",
            RecencyGroup::Older => "Older",
        }
    }
}

impl fmt::Display for RecencyGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug)]
pub struct ChatGroup<'a> {
    pub group: RecencyGroup,
    pub conversations: Vec<&'a Conversation>,
}

/// Midnight-aligned cut-off instants, computed in the caller's time zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecencyBounds {
    pub today: DateTime<Utc>,
    pub yesterday: DateTime<Utc>,
    pub week_ago: DateTime<Utc>,
}

impl RecencyBounds {
    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let yesterday = today.checked_sub_days(Days::new(1)).unwrap_or(NaiveDate::MIN);
        let week_ago = today.checked_sub_days(Days::new(7)).unwrap_or(NaiveDate::MIN);

        Self {
            today: midnight(&tz, today),
            yesterday: midnight(&tz, yesterday),
            week_ago: midnight(&tz, week_ago),
        }
    }

    pub fn classify(&self, created_at: &DateTime<Utc>) -> RecencyGroup {
        if *created_at >= self.today {
            RecencyGroup::Today
        } else if *created_at >= self.yesterday {
            RecencyGroup::Yesterday
        } else if *created_at >= self.week_ago {
            RecencyGroup::Previous7Days
        } else {
            RecencyGroup::Older
        }
    }
}

/// Start of `date` in `tz`. A midnight skipped by a DST jump resolves to the first valid local hour after it.
fn midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    (0..24)
        .filter_map(|hour| {
            let candidate = naive + Duration::hours(hour);
            tz.from_local_datetime(&candidate).earliest()
        })
        .next()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// Buckets conversations by creation time. Order inside a bucket follows the input; empty buckets are dropped.
pub fn group_by_recency<'a, Tz: TimeZone>(
    conversations: &'a [Conversation],
    now: &DateTime<Tz>
) -> Vec<ChatGroup<'a>> {
    let bounds = RecencyBounds::at(now);
    let mut groups: Vec<ChatGroup<'a>> = RecencyGroup::ALL
        .iter()
        .map(|group| ChatGroup { group: *group, conversations: Vec::new() })
        .collect();

    for conversation in conversations {
        let group = bounds.classify(&conversation.created_at);
        if let Some(bucket) = groups.iter_mut().find(|g| g.group == group) {
            bucket.conversations.push(conversation);
        }
    }

    groups.retain(|g| !g.conversations.is_empty());
    groups
}
