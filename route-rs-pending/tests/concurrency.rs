use route_rs_pending::diagnostics::Silent;
use route_rs_pending::{PendingQueue, QueueError};
use std::collections::{HashMap, HashSet};
use std::convert::TryInto;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime;

fn quiet_queue() -> PendingQueue {
    PendingQueue::new().diagnostics(Arc::new(Silent))
}

/// Eight bytes: producer id then sequence number, both big-endian.
fn tagged_payload(producer: u32, seq: u32) -> Vec<u8> {
    let mut payload = producer.to_be_bytes().to_vec();
    payload.extend_from_slice(&seq.to_be_bytes());
    payload
}

fn untag(payload: &[u8]) -> (u32, u32) {
    (
        u32::from_be_bytes(payload[0..4].try_into().unwrap()),
        u32::from_be_bytes(payload[4..8].try_into().unwrap()),
    )
}

/// Every tag is seen at most once, and each producer's packets come out in
/// the order that producer enqueued them.
fn assert_unique_and_ordered(tags: &[(u32, u32)]) {
    let unique: HashSet<&(u32, u32)> = tags.iter().collect();
    assert_eq!(unique.len(), tags.len(), "a packet was dequeued twice");

    let mut last_seq: HashMap<u32, u32> = HashMap::new();
    for (producer, seq) in tags {
        if let Some(last) = last_seq.insert(*producer, *seq) {
            assert!(
                last < *seq,
                "producer {} went from {} to {}",
                producer,
                last,
                seq
            );
        }
    }
}

#[test]
fn producers_and_one_consumer() {
    const PRODUCERS: u32 = 8;
    const PACKETS: u32 = 2000;

    let queue = quiet_queue();
    let finished = AtomicUsize::new(0);

    let dequeued = crossbeam::scope(|s| {
        for producer in 0..PRODUCERS {
            let queue = &queue;
            let finished = &finished;
            s.spawn(move |_| {
                for seq in 0..PACKETS {
                    queue.enqueue(&tagged_payload(producer, seq)).unwrap();
                }
                finished.fetch_add(1, Ordering::SeqCst);
            });
        }

        let consumer = s.spawn(|_| {
            let mut tags = vec![];
            loop {
                let done = finished.load(Ordering::SeqCst) == PRODUCERS as usize;
                match queue.dequeue() {
                    Ok(buffer) => tags.push(untag(&buffer)),
                    Err(QueueError::Empty) if done => break,
                    Err(QueueError::Empty) => std::thread::yield_now(),
                    Err(err) => panic!("dequeue failed: {:?}", err),
                }
            }
            tags
        });
        consumer.join().unwrap()
    })
    .unwrap();

    let surviving = queue.stats().unwrap().count;
    assert_eq!(dequeued.len() + surviving, (PRODUCERS * PACKETS) as usize);
    assert_eq!(surviving, 0);
    assert_unique_and_ordered(&dequeued);
    queue.check_invariants().unwrap();
}

#[test]
fn consumer_stops_early() {
    const PRODUCERS: u32 = 4;
    const PACKETS: u32 = 1000;

    let queue = quiet_queue();

    let dequeued = crossbeam::scope(|s| {
        for producer in 0..PRODUCERS {
            let queue = &queue;
            s.spawn(move |_| {
                for seq in 0..PACKETS {
                    queue.enqueue(&tagged_payload(producer, seq)).unwrap();
                }
            });
        }

        let consumer = s.spawn(|_| {
            let mut tags = vec![];
            while tags.len() < 1500 {
                if let Ok(buffer) = queue.dequeue() {
                    tags.push(untag(&buffer));
                }
            }
            tags
        });
        consumer.join().unwrap()
    })
    .unwrap();

    let surviving = queue.stats().unwrap();
    assert_eq!(dequeued.len() + surviving.count, (PRODUCERS * PACKETS) as usize);
    assert_eq!(surviving.total_bytes, surviving.count * 8);

    let mut all = dequeued;
    all.extend(queue.dequeue_all().unwrap().iter().map(|b| untag(b)));
    assert_eq!(all.len(), (PRODUCERS * PACKETS) as usize);
    assert_unique_and_ordered(&all);
}

#[test]
fn reaper_races_producers_and_consumer() {
    const PRODUCERS: u32 = 4;
    const PACKETS: u32 = 3000;

    let queue = quiet_queue().max_bucket_size(4096);
    let accepted = AtomicUsize::new(0);
    let finished = AtomicUsize::new(0);
    let discarded = AtomicUsize::new(0);

    let dequeued = crossbeam::scope(|s| {
        for producer in 0..PRODUCERS {
            let (queue, accepted, finished) = (&queue, &accepted, &finished);
            s.spawn(move |_| {
                for seq in 0..PACKETS {
                    match queue.enqueue(&tagged_payload(producer, seq)) {
                        Ok(()) => {
                            accepted.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(QueueError::Overflow) => {}
                        Err(err) => panic!("enqueue failed: {:?}", err),
                    }
                }
                finished.fetch_add(1, Ordering::SeqCst);
            });
        }

        s.spawn(|_| {
            while finished.load(Ordering::SeqCst) < PRODUCERS as usize {
                let stats = queue.drain_and_discard().unwrap();
                discarded.fetch_add(stats.count, Ordering::SeqCst);
                std::thread::yield_now();
            }
        });

        let consumer = s.spawn(|_| {
            let mut tags = vec![];
            while finished.load(Ordering::SeqCst) < PRODUCERS as usize {
                if let Ok(buffer) = queue.dequeue() {
                    tags.push(untag(&buffer));
                }
            }
            tags
        });
        consumer.join().unwrap()
    })
    .unwrap();

    let surviving = queue.stats().unwrap().count;
    assert_eq!(
        dequeued.len() + discarded.load(Ordering::SeqCst) + surviving,
        accepted.load(Ordering::SeqCst)
    );
    assert_unique_and_ordered(&dequeued);
    queue.check_invariants().unwrap();
}

#[test]
fn overshoot_is_bounded_by_in_flight_producers() {
    const PRODUCERS: usize = 8;
    const BUDGET: usize = 1000;
    const SIZE: usize = 100;

    let queue = quiet_queue().max_bucket_size(BUDGET);

    crossbeam::scope(|s| {
        for _ in 0..PRODUCERS {
            let queue = &queue;
            s.spawn(move |_| {
                let payload = vec![0u8; SIZE];
                while queue.enqueue(&payload).is_ok() {}
            });
        }
    })
    .unwrap();

    let stats = queue.stats().unwrap();
    assert!(stats.total_bytes > BUDGET);
    assert!(stats.total_bytes <= BUDGET + PRODUCERS * SIZE);
    assert_eq!(queue.enqueue(&[1]), Err(QueueError::Overflow));
    queue.check_invariants().unwrap();
}

#[test]
fn tokio_producer_tasks() {
    const PRODUCERS: u32 = 6;
    const PACKETS: u32 = 500;

    let mut rt = runtime::Builder::new()
        .threaded_scheduler()
        .enable_all()
        .build()
        .unwrap();

    let queue = Arc::new(quiet_queue());
    rt.block_on(async {
        let mut handles = vec![];
        for producer in 0..PRODUCERS {
            let queue = Arc::clone(&queue);
            handles.push(tokio::spawn(async move {
                for seq in 0..PACKETS {
                    queue.enqueue(&tagged_payload(producer, seq)).unwrap();
                    if seq % 50 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    });

    let tags: Vec<(u32, u32)> = queue
        .dequeue_all()
        .unwrap()
        .iter()
        .map(|b| untag(b))
        .collect();
    assert_eq!(tags.len(), (PRODUCERS * PACKETS) as usize);
    assert_unique_and_ordered(&tags);
    assert!(queue.is_empty());
}
