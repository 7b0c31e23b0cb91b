//! Display formatting helpers

use crate::network::TargetNetwork;
use crate::types::{Address, TxHash, Wei};

/// Checksummed `0x1234…abcd`
pub fn short_address(address: &Address) -> String {
    let s = address.to_checksum(None);
    format!("{}…{}", &s[..6], &s[s.len() - 4..])
}

/// Balance with three decimals, e.g. `1.500 IRYS`
pub fn format_balance(balance: Wei, network: &TargetNetwork) -> String {
    format!(
        "{} {}",
        balance.format_units(network.currency.decimals, 3),
        network.currency.symbol
    )
}

/// `HH:MM:SS`, or `00:00:00` when nothing is left
pub fn format_hms(ms: i64) -> String {
    if ms <= 0 {
        return "00:00:00".to_string();
    }

    let secs = ms / 1000;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// `1 day`, `5 days`
pub fn streak_label(streak: u64) -> String {
    if streak == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", streak)
    }
}

/// Hash shortened to 12 characters for inline links
pub fn short_hash(hash: &TxHash) -> String {
    let s = hash.as_str();
    if s.len() <= 12 {
        s.to_string()
    } else {
        format!("{}…", &s[..12])
    }
}

/// One flame per position: lit `🔥`, dim `·`
pub fn flames_row(flames: &[bool]) -> String {
    flames
        .iter()
        .map(|lit| if *lit { "🔥" } else { "·" })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Today's UTC date as `YYYY-MM-DD`
pub fn today_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::parse_address;

    #[test]
    fn test_short_address() {
        let addr = parse_address("0x229d336624b807489ccb034be5f8c967205c1c1a").unwrap();
        assert_eq!(short_address(&addr), "0x229D…1C1a");
    }

    #[test]
    fn test_format_balance() {
        let network = TargetNetwork::default();
        assert_eq!(
            format_balance(Wei::from_u128(2_345_600_000_000_000_000), &network),
            "2.345 IRYS"
        );
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(-5), "00:00:00");
        assert_eq!(format_hms(999), "00:00:00");
        assert_eq!(format_hms(61_000), "00:01:01");
        assert_eq!(format_hms(86_400_000), "24:00:00");
        assert_eq!(format_hms(3_723_000), "01:02:03");
    }

    #[test]
    fn test_streak_label() {
        assert_eq!(streak_label(0), "0 days");
        assert_eq!(streak_label(1), "1 day");
        assert_eq!(streak_label(12), "12 days");
    }

    #[test]
    fn test_short_hash_and_flames() {
        assert_eq!(short_hash(&TxHash("0xabc".into())), "0xabc");
        assert_eq!(
            short_hash(&TxHash("0x0123456789abcdef".into())),
            "0x0123456789…"
        );
        assert_eq!(flames_row(&[true, false]), "🔥 ·");
    }

    #[test]
    fn test_today_iso_shape() {
        let today = today_iso();
        assert_eq!(today.len(), 10);
        assert_eq!(&today[4..5], "-");
    }
}
