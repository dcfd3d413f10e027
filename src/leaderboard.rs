//! Weekly rankings across all profiles.

use itertools::Itertools;
use std::cmp::Ordering;

use crate::profile::{UserId, UserProfile, WeeklyStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum LeaderboardCategory {
    #[default]
    #[strum(to_string = "Distance")]
    Distance,
    #[strum(to_string = "Speed")]
    AvgSpeed,
    #[strum(to_string = "Pace")]
    Pace,
}

impl LeaderboardCategory {
    pub const ALL: [LeaderboardCategory; 3] = [
        LeaderboardCategory::Distance,
        LeaderboardCategory::AvgSpeed,
        LeaderboardCategory::Pace,
    ];

    pub fn value_of(&self, stats: &WeeklyStats) -> f64 {
        match self {
            LeaderboardCategory::Distance => stats.distance_km,
            LeaderboardCategory::AvgSpeed => stats.avg_speed_kmh,
            LeaderboardCategory::Pace => stats.pace_min_per_km,
        }
    }

    pub fn format_value(&self, value: f64) -> String {
        match self {
            LeaderboardCategory::Distance => format!("{value:.1} km"),
            LeaderboardCategory::AvgSpeed => format!("{value:.1} km/h"),
            LeaderboardCategory::Pace => format!("{value:.2} min/km"),
        }
    }

    pub fn next(&self) -> Self {
        match self {
            LeaderboardCategory::Distance => LeaderboardCategory::AvgSpeed,
            LeaderboardCategory::AvgSpeed => LeaderboardCategory::Pace,
            LeaderboardCategory::Pace => LeaderboardCategory::Distance,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            LeaderboardCategory::Distance => LeaderboardCategory::Pace,
            LeaderboardCategory::AvgSpeed => LeaderboardCategory::Distance,
            LeaderboardCategory::Pace => LeaderboardCategory::AvgSpeed,
        }
    }

    /// Better values first. A pace of 0 means "no run yet" and sorts last.
    fn compare(&self, a: f64, b: f64) -> Ordering {
        match self {
            LeaderboardCategory::Pace => match (a > 0.0, b > 0.0) {
                (true, true) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => Ordering::Equal,
            },
            _ => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    /// 1-based.
    pub rank: usize,
    pub user: UserProfile,
    pub value: f64,
}

impl LeaderboardEntry {
    pub fn is_podium(&self) -> bool {
        self.rank <= 3
    }
}

/// Order `users` for `category`. Ties keep their input order.
pub fn rank(users: &[UserProfile], category: LeaderboardCategory) -> Vec<LeaderboardEntry> {
    users
        .iter()
        .map(|user| (category.value_of(&user.weekly_stats), user))
        .sorted_by(|(a, _), (b, _)| category.compare(*a, *b))
        .enumerate()
        .map(|(i, (value, user))| LeaderboardEntry {
            rank: i + 1,
            user: user.clone(),
            value,
        })
        .collect()
}

/// 1-based position of `id`, or one past the end when absent.
pub fn rank_of(users: &[UserProfile], id: UserId, category: LeaderboardCategory) -> usize {
    rank(users, category)
        .iter()
        .find(|entry| entry.user.id == id)
        .map(|entry| entry.rank)
        .unwrap_or(users.len() + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: i64, name: &str, distance: f64, speed: f64, pace: f64) -> UserProfile {
        UserProfile {
            id: UserId(id),
            name: name.to_string(),
            avatar_url: String::new(),
            weekly_stats: WeeklyStats {
                distance_km: distance,
                avg_speed_kmh: speed,
                pace_min_per_km: pace,
            },
        }
    }

    fn league() -> Vec<UserProfile> {
        vec![
            profile(1, "Alex", 12.5, 10.2, 5.9),
            profile(2, "Sarah", 21.0, 11.5, 5.2),
            profile(3, "Mike", 8.2, 9.0, 6.7),
            profile(4, "New", 0.0, 0.0, 0.0),
            profile(5, "Jess", 15.3, 12.1, 4.9),
        ]
    }

    fn names(entries: &[LeaderboardEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.user.name.as_str()).collect()
    }

    #[test]
    fn test_rank_by_distance() {
        let entries = rank(&league(), LeaderboardCategory::Distance);
        assert_eq!(names(&entries), vec!["Sarah", "Jess", "Alex", "Mike", "New"]);
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[0].value, 21.0);
        assert_eq!(entries[4].rank, 5);
    }

    #[test]
    fn test_rank_by_speed() {
        let entries = rank(&league(), LeaderboardCategory::AvgSpeed);
        assert_eq!(names(&entries), vec!["Jess", "Sarah", "Alex", "Mike", "New"]);
    }

    #[test]
    fn test_rank_by_pace_puts_missing_pace_last() {
        let entries = rank(&league(), LeaderboardCategory::Pace);
        assert_eq!(names(&entries), vec!["Jess", "Sarah", "Alex", "Mike", "New"]);
        assert_eq!(entries[4].value, 0.0);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let users = vec![
            profile(1, "A", 5.0, 0.0, 0.0),
            profile(2, "B", 5.0, 0.0, 0.0),
            profile(3, "C", 5.0, 0.0, 0.0),
        ];
        assert_eq!(names(&rank(&users, LeaderboardCategory::Distance)), vec!["A", "B", "C"]);
        assert_eq!(names(&rank(&users, LeaderboardCategory::Pace)), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_rank_of() {
        let users = league();
        assert_eq!(rank_of(&users, UserId(2), LeaderboardCategory::Distance), 1);
        assert_eq!(rank_of(&users, UserId(3), LeaderboardCategory::Distance), 4);
        assert_eq!(rank_of(&users, UserId(99), LeaderboardCategory::Distance), 6);
        assert_eq!(rank_of(&[], UserId(1), LeaderboardCategory::Pace), 1);
    }

    #[test]
    fn test_podium() {
        let entries = rank(&league(), LeaderboardCategory::Distance);
        let podium: Vec<bool> = entries.iter().map(LeaderboardEntry::is_podium).collect();
        assert_eq!(podium, vec![true, true, true, false, false]);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(LeaderboardCategory::Distance.format_value(12.46), "12.5 km");
        assert_eq!(LeaderboardCategory::AvgSpeed.format_value(10.8), "10.8 km/h");
        assert_eq!(LeaderboardCategory::Pace.format_value(5.5), "5.50 min/km");
    }

    #[test]
    fn test_category_cycle() {
        let mut category = LeaderboardCategory::default();
        for expected in LeaderboardCategory::ALL.iter().cycle().skip(1).take(3) {
            category = category.next();
            assert_eq!(category, *expected);
        }
        assert_eq!(LeaderboardCategory::Distance.previous(), LeaderboardCategory::Pace);
        assert_eq!(LeaderboardCategory::AvgSpeed.to_string(), "Speed");
    }
}
