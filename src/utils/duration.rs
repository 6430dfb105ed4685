use std::str::FromStr;

use crate::utils::error::CommonError;

/// A duration parsed from a short human form: `45s`, `30m`, `2h`, `3d`, `1w`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration {
    seconds: i64,
}

impl HumanDuration {
    pub fn seconds(&self) -> i64 {
        self.seconds
    }
}

impl FromStr for HumanDuration {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_lowercase();
        let invalid = || CommonError::InvalidDuration(s.to_string());
        if trimmed.is_empty() || !trimmed.is_ascii() {
            return Err(invalid());
        }

        let (value, unit) = trimmed.split_at(trimmed.len() - 1);
        let value: i64 = value.parse().map_err(|_| invalid())?;
        if value <= 0 {
            return Err(invalid());
        }

        let multiplier = match unit {
            "s" => 1,
            "m" => 60,
            "h" => 3_600,
            "d" => 86_400,
            "w" => 604_800,
            _ => return Err(invalid()),
        };

        Ok(HumanDuration {
            seconds: value * multiplier,
        })
    }
}

/// Renders a second count the way users wrote it: largest whole unit first.
pub fn humanize_seconds(seconds: i64) -> String {
    const UNITS: [(i64, &str); 5] = [
        (604_800, "week"),
        (86_400, "day"),
        (3_600, "hour"),
        (60, "minute"),
        (1, "second"),
    ];

    let mut remaining = seconds.max(0);
    let mut parts = Vec::new();
    for (size, name) in UNITS {
        let count = remaining / size;
        if count > 0 {
            parts.push(format!(
                "{} {}{}",
                count,
                name,
                if count == 1 { "" } else { "s" }
            ));
            remaining %= size;
        }
        if parts.len() == 2 {
            break;
        }
    }

    if parts.is_empty() {
        "0 seconds".to_string()
    } else {
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_unit() {
        assert_eq!("45s".parse::<HumanDuration>().unwrap().seconds(), 45);
        assert_eq!("30m".parse::<HumanDuration>().unwrap().seconds(), 1_800);
        assert_eq!("2h".parse::<HumanDuration>().unwrap().seconds(), 7_200);
        assert_eq!("3d".parse::<HumanDuration>().unwrap().seconds(), 259_200);
        assert_eq!("1w".parse::<HumanDuration>().unwrap().seconds(), 604_800);
        assert_eq!(" 1H ".parse::<HumanDuration>().unwrap().seconds(), 3_600);
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "h", "10", "-5m", "0m", "3x", "an hour"] {
            assert!(bad.parse::<HumanDuration>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn humanizes_round_and_mixed_values() {
        assert_eq!(humanize_seconds(3_600), "1 hour");
        assert_eq!(humanize_seconds(5_400), "1 hour 30 minutes");
        assert_eq!(humanize_seconds(0), "0 seconds");
        assert_eq!(humanize_seconds(86_400 * 9), "1 week 2 days");
    }
}
