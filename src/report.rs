use csv::Writer;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::error::ExportError;
use crate::types::NetworkRecord;

/// Column titles, in output order.
pub const HEADERS: [&str; 7] = [
    "Region",
    "VPC ID",
    "VPC Name",
    "VPC CIDR",
    "Subnet ID",
    "Subnet Name",
    "Subnet CIDR",
];

pub const CONTENT_TYPE: &str = "text/csv";

/// A rendered CSV report ready to be written or downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Render `records` as a CSV report named after the current time.
///
/// An empty slice is refused with [`ExportError::NoData`] before anything is written.
pub fn export(records: &[NetworkRecord]) -> Result<Report, ExportError> {
    if records.is_empty() {
        return Err(ExportError::NoData);
    }
    Ok(Report {
        filename: report_filename(now_local_or_utc()),
        content_type: CONTENT_TYPE,
        bytes: render_csv(records)?,
    })
}

/// CSV bytes for `records`: header row, then one row per record in input order.
pub fn render_csv(records: &[NetworkRecord]) -> Result<Vec<u8>, ExportError> {
    let mut wtr = Writer::from_writer(vec![]);
    wtr.write_record(HEADERS)?;

    for r in records {
        wtr.write_record([
            &r.region,
            &r.vpc_id,
            &r.vpc_name,
            &r.vpc_cidr,
            &r.subnet_id,
            &r.subnet_name,
            &r.subnet_cidr,
        ])?;
    }

    wtr.into_inner()
        .map_err(|e| ExportError::Flush(e.error().to_string()))
}

/// `aws_vpc_subnet_report_YYYYMMDD_HHMMSS.csv`
pub fn report_filename(at: OffsetDateTime) -> String {
    let stamp = at
        .format(format_description!(
            "[year][month][day]_[hour][minute][second]"
        ))
        .unwrap_or_else(|_| at.unix_timestamp().to_string());
    format!("aws_vpc_subnet_report_{stamp}.csv")
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample() -> Vec<NetworkRecord> {
        vec![
            NetworkRecord {
                region: "us-east-1".into(),
                vpc_id: "vpc-1".into(),
                vpc_name: "prod, main".into(),
                vpc_cidr: "10.0.0.0/16".into(),
                subnet_id: "subnet-1".into(),
                subnet_name: "public-a".into(),
                subnet_cidr: "10.0.1.0/24".into(),
            },
            NetworkRecord {
                region: "us-west-2".into(),
                vpc_id: "vpc-2".into(),
                vpc_cidr: "172.31.0.0/16".into(),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn renders_header_and_rows_in_order() {
        let bytes = render_csv(&sample()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Region,VPC ID,VPC Name,VPC CIDR,Subnet ID,Subnet Name,Subnet CIDR",
                "us-east-1,vpc-1,\"prod, main\",10.0.0.0/16,subnet-1,public-a,10.0.1.0/24",
                "us-west-2,vpc-2,,172.31.0.0/16,,,",
            ]
        );
    }

    #[test]
    fn empty_records_are_refused() {
        assert!(matches!(export(&[]), Err(ExportError::NoData)));
    }

    #[test]
    fn filename_has_second_resolution() {
        let at = datetime!(2024-03-05 07:08:09 UTC);
        assert_eq!(report_filename(at), "aws_vpc_subnet_report_20240305_070809.csv");
    }

    #[test]
    fn export_is_deterministic() {
        let a = export(&sample()).unwrap();
        let b = export(&sample()).unwrap();
        assert_eq!(a.bytes, b.bytes);
        assert_eq!(a.content_type, "text/csv");
        assert!(a.filename.starts_with("aws_vpc_subnet_report_"));
    }
}
