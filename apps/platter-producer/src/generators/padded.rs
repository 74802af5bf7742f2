use bytes::Bytes;
use platter_domain::ports::RecordSource;

/// Build a blob holding a UTF-8 string: the sequence number in decimal, a
/// space, then `a` padding until `total_len` bytes.
///
/// A sequence number longer than `total_len` is kept whole.
pub fn generate_data(sequence: u64, total_len: usize) -> Bytes {
    let mut data = format!("{} ", sequence);
    if data.len() < total_len {
        let padding = total_len - data.len();
        data.extend(std::iter::repeat('a').take(padding));
    }
    Bytes::from(data)
}

/// Yields `count` padded blobs numbered from 0
#[derive(Debug, Clone)]
pub struct PaddedSequenceSource {
    next: u64,
    count: u64,
    record_size: usize,
}

impl PaddedSequenceSource {
    pub fn new(count: u64, record_size: usize) -> Self {
        Self {
            next: 0,
            count,
            record_size,
        }
    }
}

impl RecordSource for PaddedSequenceSource {
    fn next_payload(&mut self) -> Option<Bytes> {
        if self.next >= self.count {
            return None;
        }
        let payload = generate_data(self.next, self.record_size);
        self.next += 1;
        Some(payload)
    }

    fn size_hint(&self) -> Option<u64> {
        Some(self.count - self.next)
    }
}
