//! Arithmetic over small ordered alphabets (the salt byte of a row key).

use bytes::Bytes;

use splitscan_core::{CharRange, CoreError, KeyRange};

use crate::Result;

/// Splits `ranges` into buckets of roughly `span / bucket_count` characters.
///
/// The step is rounded half-to-even and never below one. Each declared range
/// is bucketed on its own; its last bucket absorbs any remainder shorter than
/// a full step. Buckets come back disjoint, ordered within each range, and
/// covering every character exactly once.
pub fn partition(ranges: &[CharRange], bucket_count: usize) -> Result<Vec<CharRange>> {
    if bucket_count == 0 {
        return Err(CoreError::invalid_config("bucket count must be > 0"));
    }

    let span: usize = ranges.iter().map(CharRange::len).sum();
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let step = ((span as f64 / bucket_count as f64).round_ties_even() as usize).max(1);

    let mut buckets = Vec::new();
    for range in ranges {
        let end = usize::from(range.end);
        let mut lo = usize::from(range.start);
        loop {
            if lo + 2 * step - 1 > end {
                buckets.push(char_range(lo, end));
                break;
            }
            buckets.push(char_range(lo, lo + step - 1));
            lo += step;
        }
    }

    tracing::debug!(span, bucket_count, step, buckets = buckets.len(), "partitioned salt alphabet");
    Ok(buckets)
}

fn char_range(start: usize, end: usize) -> CharRange {
    // both bounds come from u8 ranges, so they fit
    CharRange::new(
        u8::try_from(start).unwrap_or(u8::MAX),
        u8::try_from(end).unwrap_or(u8::MAX),
    )
}

/// Closed-interval intersection, `None` when disjoint.
pub fn intersect(a: CharRange, b: CharRange) -> Option<CharRange> {
    let start = a.start.max(b.start);
    let end = a.end.min(b.end);
    (start <= end).then_some(CharRange { start, end })
}

/// Narrows each bucket to `bound`, dropping buckets outside it.
pub fn clip(buckets: &[CharRange], bound: CharRange) -> Vec<CharRange> {
    buckets
        .iter()
        .filter_map(|bucket| intersect(*bucket, bound))
        .collect()
}

/// Row keys whose first byte falls in `bucket`.
pub fn bucket_key_range(bucket: CharRange) -> KeyRange {
    KeyRange {
        start: Some(Bytes::copy_from_slice(&[bucket.start])),
        end: bucket
            .end
            .checked_add(1)
            .map(|next| Bytes::copy_from_slice(&[next])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitscan_core::SaltSpec;

    fn assert_exact_cover(ranges: &[CharRange], buckets: &[CharRange]) {
        let mut covered: Vec<u8> = buckets
            .iter()
            .flat_map(|bucket| bucket.start..=bucket.end)
            .collect();
        let expected: Vec<u8> = ranges
            .iter()
            .flat_map(|range| range.start..=range.end)
            .collect();
        assert_eq!(covered.len(), expected.len(), "buckets overlap or miss values");
        covered.sort_unstable();
        let mut sorted_expected = expected;
        sorted_expected.sort_unstable();
        assert_eq!(covered, sorted_expected);
    }

    #[test]
    fn test_partition_two_buckets() {
        let digits = [CharRange::new(b'0', b'9')];
        let buckets = partition(&digits, 2).unwrap();
        assert_eq!(
            buckets,
            vec![CharRange::new(b'0', b'4'), CharRange::new(b'5', b'9')]
        );
    }

    #[test]
    fn test_partition_step_rounds_half_to_even() {
        let digits = [CharRange::new(b'0', b'9')];
        // 10 / 20 = 0.5 rounds to 0, clamped to 1
        let buckets = partition(&digits, 20).unwrap();
        assert_eq!(buckets.len(), 10);
        assert!(buckets.iter().all(|bucket| bucket.len() == 1));

        // 10 / 4 = 2.5 rounds to 2; the last bucket absorbs the remainder
        let buckets = partition(&digits, 4).unwrap();
        assert_eq!(
            buckets,
            vec![
                CharRange::new(b'0', b'1'),
                CharRange::new(b'2', b'3'),
                CharRange::new(b'4', b'5'),
                CharRange::new(b'6', b'7'),
                CharRange::new(b'8', b'9'),
            ]
        );
    }

    #[test]
    fn test_partition_exact_cover_for_every_bucket_count() {
        let salt = SaltSpec::parse("0-9,A-F,a-z").unwrap();
        for bucket_count in 1..=salt.alphabet_size() {
            let buckets = partition(salt.ranges(), bucket_count).unwrap();
            assert_exact_cover(salt.ranges(), &buckets);
            // declared ranges are ascending here, so buckets are too
            assert!(buckets.windows(2).all(|pair| pair[0].end < pair[1].start));
        }
    }

    #[test]
    fn test_partition_rejects_zero_buckets() {
        let err = partition(&[CharRange::new(b'a', b'f')], 0).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_partition_full_byte_range() {
        let all = [CharRange::new(0, u8::MAX)];
        let buckets = partition(&all, 3).unwrap();
        assert_exact_cover(&all, &buckets);
        assert_eq!(buckets.last().map(|bucket| bucket.end), Some(u8::MAX));
    }

    #[test]
    fn test_clip() {
        let buckets = [CharRange::new(b'0', b'4'), CharRange::new(b'5', b'9')];
        let clipped = clip(&buckets, CharRange::new(b'3', b'7'));
        assert_eq!(
            clipped,
            vec![CharRange::new(b'3', b'4'), CharRange::new(b'5', b'7')]
        );

        assert!(clip(&buckets, CharRange::new(b'A', b'Z')).is_empty());
        assert_eq!(clip(&buckets, CharRange::new(0, u8::MAX)), buckets.to_vec());
    }

    #[test]
    fn test_intersect_touching() {
        assert_eq!(
            intersect(CharRange::new(b'0', b'4'), CharRange::new(b'4', b'9')),
            Some(CharRange::single(b'4'))
        );
        assert_eq!(
            intersect(CharRange::new(b'0', b'3'), CharRange::new(b'4', b'9')),
            None
        );
    }

    #[test]
    fn test_bucket_key_range() {
        let range = bucket_key_range(CharRange::new(b'0', b'4'));
        assert!(range.contains(b"0-US-1"));
        assert!(range.contains(b"4\xff"));
        assert!(!range.contains(b"5-US-1"));

        let last = bucket_key_range(CharRange::new(b'z', u8::MAX));
        assert!(last.end.is_none());
    }
}
