use std::time::Duration;

use proptest::prelude::*;
use tape_log::{LineReader, Packet, PacketKind, Sink, Source, IO_SIZE_MIN};

const START: Duration = Duration::from_millis(1_700_000_000_000);

/// Encode `writes` as a session, then replay the log.
fn replay<D: AsRef<[u8]>>(io_size: usize, writes: &[(u64, bool, D)]) -> Vec<Packet> {
    let mut sink = Sink::new(Vec::new(), "host", "user", 1, io_size, START).expect("sink");
    let mut now = START;
    for (delta, output, data) in writes {
        now += Duration::from_millis(*delta);
        sink.io_write(now, *output, data.as_ref()).expect("io write");
    }
    sink.finish().expect("finish");

    let log = sink.into_inner();
    Source::new(LineReader::new(&log[..]))
        .collect::<Result<Vec<_>, _>>()
        .expect("log replays cleanly")
}

fn direction(packets: &[Packet], wanted: bool) -> Vec<u8> {
    packets
        .iter()
        .filter_map(|packet| match &packet.kind {
            PacketKind::Io { output, data } if *output == wanted => Some(data.as_slice()),
            _ => None,
        })
        .flatten()
        .copied()
        .collect()
}

/// Join neighbours that share a timestamp and direction.
fn coalesce(items: impl IntoIterator<Item = (Duration, bool, Vec<u8>)>) -> Vec<(Duration, bool, Vec<u8>)> {
    let mut merged: Vec<(Duration, bool, Vec<u8>)> = Vec::new();
    for (at, output, data) in items {
        match merged.last_mut() {
            Some(last) if last.0 == at && last.1 == output => last.2.extend(data),
            _ => merged.push((at, output, data)),
        }
    }
    merged
}

proptest! {
    #[test]
    fn byte_streams_survive_per_direction(
        io_size in IO_SIZE_MIN..512usize,
        writes in prop::collection::vec(
            (0u64..300, any::<bool>(), prop::collection::vec(any::<u8>(), 0..48)),
            0..24,
        ),
    ) {
        let packets = replay(io_size, &writes);
        for wanted in [false, true] {
            let sent: Vec<u8> = writes
                .iter()
                .filter(|(_, output, _)| *output == wanted)
                .flat_map(|(_, _, data)| data.iter().copied())
                .collect();
            prop_assert_eq!(direction(&packets, wanted), sent);
        }
    }

    #[test]
    fn text_keeps_timing_and_order(
        io_size in IO_SIZE_MIN..512usize,
        writes in prop::collection::vec(
            (0u64..2_000, any::<bool>(), "\\PC{1,16}"),
            1..24,
        ),
    ) {
        let packets = replay(io_size, &writes);

        let mut now = Duration::ZERO;
        let expected = coalesce(writes.iter().map(|(delta, output, text)| {
            now += Duration::from_millis(*delta);
            (now, *output, text.as_bytes().to_vec())
        }));
        let actual = coalesce(packets.into_iter().map(|packet| match packet.kind {
            PacketKind::Io { output, data } => (packet.timestamp, output, data),
            PacketKind::Window { .. } => panic!("no window records were written"),
        }));
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn interleaved_bytes_keep_order_and_timing(
        io_size in IO_SIZE_MIN..256usize,
        writes in prop::collection::vec(
            (
                0u64..300,
                any::<bool>(),
                prop::collection::vec(prop_oneof![any::<u8>(), 0xc2u8..0xf5, 0x80u8..0xc0], 1..8),
            ),
            1..24,
        ),
    ) {
        let packets = replay(io_size, &writes);

        let mut now = Duration::ZERO;
        let written_at: Vec<Duration> = writes
            .iter()
            .map(|(delta, _, _)| {
                now += Duration::from_millis(*delta);
                now
            })
            .collect();
        let mut origin: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
        for (index, (_, output, data)) in writes.iter().enumerate() {
            origin[usize::from(*output)].extend(std::iter::repeat(index).take(data.len()));
        }

        let mut replayed = [0usize; 2];
        let mut latest: [Option<usize>; 2] = [None, None];
        for packet in &packets {
            let PacketKind::Io { output, data } = &packet.kind else {
                panic!("no window records were written");
            };
            let side = usize::from(*output);
            for _ in data {
                prop_assert!(replayed[side] < origin[side].len());
                let index = origin[side][replayed[side]];
                replayed[side] += 1;

                // A byte lands at its own write, or at a later write in the
                // same direction that completed its character.
                let allowed: Vec<Duration> = (index..writes.len())
                    .take_while(|&later| writes[later].1 == *output)
                    .map(|later| written_at[later])
                    .collect();
                prop_assert!(
                    allowed.contains(&packet.timestamp),
                    "byte of write {} replayed at {:?}, allowed {:?}",
                    index,
                    packet.timestamp,
                    allowed
                );
                if let Some(other) = latest[1 - side] {
                    prop_assert!(other < index, "write {} replayed after write {}", index, other);
                }
                latest[side] = latest[side].max(Some(index));
            }
        }
        prop_assert_eq!(replayed, [origin[0].len(), origin[1].len()]);
    }
}
