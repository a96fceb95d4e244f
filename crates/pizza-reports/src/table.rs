//! Tabular view of the history log shared by both report formats.

use pizza_models::HistoryRecord;

/// Column headings, in column order.
pub const REPORT_HEADERS: [&str; 4] = ["Date and time", "Pizza count", "Type", "File"];

/// One rendered history row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub timestamp: String,
    pub count: u32,
    pub media_type: String,
    pub file: String,
}

impl From<&HistoryRecord> for ReportRow {
    fn from(record: &HistoryRecord) -> Self {
        Self {
            timestamp: record.timestamp_iso(),
            count: record.count,
            media_type: record.media_type.as_str().to_string(),
            file: record.result_path.clone(),
        }
    }
}

/// Report title, headings and rows in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    pub title: String,
    pub rows: Vec<ReportRow>,
}

impl ReportTable {
    pub const TITLE: &'static str = "Pizza processing report";

    /// Build a table from records already sorted newest first.
    pub fn from_records(records: &[HistoryRecord]) -> Self {
        Self {
            title: Self::TITLE.to_string(),
            rows: records.iter().map(ReportRow::from).collect(),
        }
    }

    pub fn headers(&self) -> [&'static str; 4] {
        REPORT_HEADERS
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pizza_models::MediaType;

    #[test]
    fn test_rows_keep_order_and_format() {
        let ts = NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_micro_opt(9, 30, 0, 5)
            .unwrap();
        let records = vec![
            HistoryRecord {
                timestamp: ts,
                count: 4,
                media_type: MediaType::Video,
                result_path: "static/result.mp4".into(),
            },
            HistoryRecord {
                timestamp: ts,
                count: 0,
                media_type: MediaType::Image,
                result_path: "static/result.jpg".into(),
            },
        ];

        let table = ReportTable::from_records(&records);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.rows[0],
            ReportRow {
                timestamp: "2024-07-01T09:30:00.000005".into(),
                count: 4,
                media_type: "video".into(),
                file: "static/result.mp4".into(),
            }
        );
        assert_eq!(table.rows[1].media_type, "image");
    }

    #[test]
    fn test_empty_table() {
        let table = ReportTable::from_records(&[]);
        assert!(table.is_empty());
        assert_eq!(table.headers()[1], "Pizza count");
    }
}
