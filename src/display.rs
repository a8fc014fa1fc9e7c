use std::path::{Path, PathBuf};

use chrono::Duration;
use thousands::Separable;

pub trait Display {
    fn to_display(&self) -> String;
}

impl Display for f64 {
    fn to_display(&self) -> String {
        let tmp = (100.0 * self).round() / 100.0;
        tmp.separate_with_commas()
    }
}

impl Display for i64 {
    fn to_display(&self) -> String {
        self.separate_with_commas()
    }
}

impl Display for usize {
    fn to_display(&self) -> String {
        self.separate_with_commas()
    }
}

impl Display for Duration {
    fn to_display(&self) -> String {
        let seconds = self.num_seconds();
        if seconds == 0 {
            return format!("{}ms", self.num_milliseconds());
        }
        let hours = seconds / (60 * 60);
        let minutes = (seconds % (60 * 60)) / 60;
        let remain_seconds = seconds % 60;

        let mut parts = vec![];
        if hours != 0 {
            parts.push(format!("{}h", hours));
        }
        if minutes != 0 {
            parts.push(format!("{:0>2}m", minutes));
        }
        if remain_seconds != 0 {
            parts.push(format!("{:0>2}s", remain_seconds));
        }
        parts.join(" ")
    }
}

impl Display for PathBuf {
    fn to_display(&self) -> String {
        self.as_path().to_display()
    }
}

impl Display for &Path {
    fn to_display(&self) -> String {
        self.to_str()
            .unwrap_or("Path with invalid(s) character(s)")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f64_to_display() {
        assert_eq!(1.23456.to_display(), "1.23");
        assert_eq!(0.0.to_display(), "0");
        assert_eq!(12345.678.to_display(), "12,345.68");
    }

    #[test]
    fn test_integers_to_display() {
        assert_eq!(9876543210i64.to_display(), "9,876,543,210");
        assert_eq!(0i64.to_display(), "0");
        assert_eq!(12345usize.to_display(), "12,345");
    }

    #[test]
    fn test_duration_to_display() {
        assert_eq!(Duration::seconds(52325).to_display(), "14h 32m 05s");
        assert_eq!(Duration::seconds(75).to_display(), "01m 15s");
        assert_eq!(Duration::seconds(12).to_display(), "12s");
        assert_eq!(Duration::milliseconds(250).to_display(), "250ms");
    }

    #[test]
    fn test_pathbuf_to_display() {
        let pathbuf = PathBuf::from("/path/to/some/file.txt");
        assert_eq!(pathbuf.to_display(), "/path/to/some/file.txt".to_string());
    }
}
