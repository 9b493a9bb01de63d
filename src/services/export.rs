use std::io::Write;

use anyhow::Result;
use chrono::SecondsFormat;

use crate::models::MatchRecord;

const BOM: &str = "\u{FEFF}";

const HEADERS: [&str; 7] = [
    "Home team",
    "Away team",
    "Half time",
    "Full time",
    "BTTS",
    "Comeback",
    "Match time",
];

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Write records as spreadsheet-friendly CSV, prefixed with a UTF-8 BOM.
pub fn write_csv<W: Write>(records: &[MatchRecord], mut out: W) -> Result<()> {
    out.write_all(BOM.as_bytes())?;

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out);

    writer.write_record(HEADERS)?;

    for record in records {
        let half_time = match (record.half_time_home_goals, record.half_time_away_goals) {
            (Some(home), Some(away)) => format!("{}-{}", home, away),
            _ => "N/A".to_string(),
        };
        let full_time = format!("{}-{}", record.full_time_home_goals, record.full_time_away_goals);
        let match_time = record.match_time.to_rfc3339_opts(SecondsFormat::Secs, true);

        writer.write_record([
            record.home_team.as_str(),
            record.away_team.as_str(),
            half_time.as_str(),
            full_time.as_str(),
            yes_no(record.is_btts()),
            yes_no(record.is_comeback()),
            match_time.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn to_csv_string(records: &[MatchRecord]) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(records, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_csv_layout() {
        let kickoff = Utc.with_ymd_and_hms(2024, 4, 13, 16, 0, 0).unwrap();
        let records = vec![
            MatchRecord::from_scores("Paks", "Debrecen", (2, 1), Some((0, 1)), kickoff),
            MatchRecord::from_scores("Paks", "Debrecen", (0, 0), None, kickoff),
        ];

        let csv = to_csv_string(&records).unwrap();
        let lines: Vec<&str> = csv.trim_start_matches(BOM).lines().collect();

        assert!(csv.starts_with(BOM));
        assert_eq!(lines[0], "Home team,Away team,Half time,Full time,BTTS,Comeback,Match time");
        assert_eq!(lines[1], "Paks,Debrecen,0-1,2-1,Yes,Yes,2024-04-13T16:00:00Z");
        assert_eq!(lines[2], "Paks,Debrecen,N/A,0-0,No,No,2024-04-13T16:00:00Z");
    }

    #[test]
    fn test_csv_quotes_special_characters() {
        let kickoff = Utc.with_ymd_and_hms(2024, 4, 13, 16, 0, 0).unwrap();
        let records = vec![MatchRecord::from_scores(
            "Budapest, Honvéd",
            "The \"Lions\"",
            (1, 1),
            Some((1, 1)),
            kickoff,
        )];

        let csv = to_csv_string(&records).unwrap();
        assert!(csv.contains("\"Budapest, Honvéd\",\"The \"\"Lions\"\"\",1-1,1-1,Yes,No,"));
    }
}
