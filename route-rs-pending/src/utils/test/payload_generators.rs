/// A payload of exactly `size` bytes filled with a repeating byte pattern, so
/// truncation or reordering inside a payload shows up in assertions.
pub fn sized_payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// `count` distinct payloads. Each starts with its sequence number and is
/// padded to a length between 4 and 10 bytes, so sizes vary along the stream.
pub fn numbered_payloads(count: u32) -> Vec<Vec<u8>> {
    (0..count)
        .map(|seq| {
            let mut payload = seq.to_be_bytes().to_vec();
            payload.resize(4 + (seq % 7) as usize, 0xee);
            payload
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn sized_payload_has_requested_length() {
        assert_eq!(sized_payload(0).len(), 0);
        assert_eq!(sized_payload(1500).len(), 1500);
        assert_eq!(sized_payload(300)[251], 0);
    }

    #[test]
    fn numbered_payloads_are_distinct() {
        let payloads = numbered_payloads(1000);
        let unique: HashSet<&Vec<u8>> = payloads.iter().collect();
        assert_eq!(unique.len(), 1000);
    }
}
