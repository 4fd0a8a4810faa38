use clap::{App, Arg, ArgMatches};
use route_rs_pending::diagnostics::{Log, Silent};
use route_rs_pending::{Destination, PendingQueue, QueueError, SharedDiagnostics};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A neighbor entry as the forwarding path sees it: where the packets are
/// headed, whether resolution will ever succeed in this run, and the queue
/// holding them in the meantime.
struct Neighbor {
    dest: Destination,
    resolves: bool,
    queue: Arc<PendingQueue>,
}

struct Options {
    producers: usize,
    packets: usize,
    size: usize,
    destinations: usize,
    resolve_after: Duration,
    timeout: Duration,
    verbose: bool,
}

fn numeric(value: String) -> Result<(), String> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(()),
        _ => Err(format!("{} is not a positive integer", value)),
    }
}

fn parse_args() -> Options {
    let matches = App::new("route-rs arp-holdover")
        .version("0.1.0")
        .about("Holds packets in pending queues while their next hop is resolved")
        .arg(
            Arg::with_name("producers")
                .short("p")
                .long("producers")
                .value_name("TASKS")
                .help("Number of forwarding tasks")
                .takes_value(true)
                .default_value("4")
                .validator(numeric),
        )
        .arg(
            Arg::with_name("packets")
                .short("n")
                .long("packets")
                .value_name("COUNT")
                .help("Packets forwarded by each task")
                .takes_value(true)
                .default_value("5000")
                .validator(numeric),
        )
        .arg(
            Arg::with_name("size")
                .short("s")
                .long("size")
                .value_name("BYTES")
                .help("Payload size of each packet")
                .takes_value(true)
                .default_value("512")
                .validator(numeric),
        )
        .arg(
            Arg::with_name("destinations")
                .short("d")
                .long("destinations")
                .value_name("COUNT")
                .help("Number of next hops; odd-numbered ones never resolve")
                .takes_value(true)
                .default_value("4")
                .validator(|d| {
                    numeric(d.clone())?;
                    if d.parse::<usize>().unwrap_or(0) <= 254 {
                        Ok(())
                    } else {
                        Err(format!("{} destinations do not fit in 10.0.0.0/24", d))
                    }
                }),
        )
        .arg(
            Arg::with_name("resolve-after")
                .long("resolve-after-ms")
                .value_name("MILLIS")
                .help("Delay before even-numbered next hops resolve")
                .takes_value(true)
                .default_value("20")
                .validator(numeric),
        )
        .arg(
            Arg::with_name("timeout")
                .long("timeout-ms")
                .value_name("MILLIS")
                .help("Delay before unresolved next hops are reaped")
                .takes_value(true)
                .default_value("50")
                .validator(numeric),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Log every queue event to stderr"),
        )
        .get_matches();

    options_from(&matches)
}

fn options_from(matches: &ArgMatches) -> Options {
    // Every numeric argument has a default and passed `numeric`.
    let number = |name: &str| -> usize {
        matches
            .value_of(name)
            .and_then(|v| v.parse().ok())
            .unwrap_or(1)
    };

    Options {
        producers: number("producers"),
        packets: number("packets"),
        size: number("size"),
        destinations: number("destinations"),
        resolve_after: Duration::from_millis(number("resolve-after") as u64),
        timeout: Duration::from_millis(number("timeout") as u64),
        verbose: matches.is_present("verbose"),
    }
}

fn build_table(opts: &Options) -> Vec<Neighbor> {
    let diagnostics: SharedDiagnostics = if opts.verbose {
        Arc::new(Log::new(std::io::stderr()))
    } else {
        Arc::new(Silent)
    };

    (0..opts.destinations)
        .map(|i| {
            let dest = Destination::new(i % 2, Ipv4Addr::new(10, 0, 0, (i + 1) as u8));
            Neighbor {
                dest,
                resolves: i % 2 == 0,
                queue: Arc::new(
                    PendingQueue::for_destination(dest).diagnostics(Arc::clone(&diagnostics)),
                ),
            }
        })
        .collect()
}

fn task_failed(err: tokio::task::JoinError) -> failure::Error {
    failure::format_err!("task failed: {}", err)
}

fn main() -> Result<(), failure::Error> {
    let opts = parse_args();
    let table = Arc::new(build_table(&opts));

    let accepted = Arc::new(AtomicUsize::new(0));
    let overflowed = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));

    let mut runtime = tokio::runtime::Builder::new()
        .threaded_scheduler()
        .enable_all()
        .build()?;

    let (sent, reaped) = runtime.block_on(async {
        let mut producers = vec![];
        for producer in 0..opts.producers {
            let table = Arc::clone(&table);
            let accepted = Arc::clone(&accepted);
            let overflowed = Arc::clone(&overflowed);
            let finished = Arc::clone(&finished);
            let (packets, size) = (opts.packets, opts.size);

            producers.push(tokio::spawn(async move {
                let payload = vec![producer as u8; size];
                for seq in 0..packets {
                    let neighbor = &table[(producer + seq) % table.len()];
                    match neighbor.queue.enqueue(&payload) {
                        Ok(()) => {
                            accepted.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(QueueError::Overflow) => {
                            overflowed.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(err) => {
                            finished.fetch_add(1, Ordering::SeqCst);
                            return Err(err);
                        }
                    }
                    if seq % 64 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
                finished.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        }

        let resolver = {
            let table = Arc::clone(&table);
            let finished = Arc::clone(&finished);
            let (delay, producers) = (opts.resolve_after, opts.producers);
            tokio::spawn(async move {
                tokio::time::delay_for(delay).await;
                let mut sent = 0;
                loop {
                    let done = finished.load(Ordering::SeqCst) == producers;
                    for neighbor in table.iter().filter(|n| n.resolves) {
                        // Retransmission would happen here.
                        sent += neighbor.queue.dequeue_all()?.len();
                    }
                    if done {
                        return Ok::<usize, QueueError>(sent);
                    }
                    tokio::time::delay_for(Duration::from_millis(1)).await;
                }
            })
        };

        let reaper = {
            let table = Arc::clone(&table);
            let finished = Arc::clone(&finished);
            let (delay, producers) = (opts.timeout, opts.producers);
            tokio::spawn(async move {
                tokio::time::delay_for(delay).await;
                let mut reaped = 0;
                loop {
                    let done = finished.load(Ordering::SeqCst) == producers;
                    for neighbor in table.iter().filter(|n| !n.resolves) {
                        reaped += neighbor.queue.drain_and_discard()?.count;
                    }
                    if done {
                        return Ok::<usize, QueueError>(reaped);
                    }
                    tokio::time::delay_for(Duration::from_millis(1)).await;
                }
            })
        };

        for producer in producers {
            producer.await.map_err(task_failed)??;
        }
        let sent = resolver.await.map_err(task_failed)??;
        let reaped = reaper.await.map_err(task_failed)??;
        Ok::<(usize, usize), failure::Error>((sent, reaped))
    })?;

    // Entries are torn down now; anything still queued is discarded first.
    let mut leftover = 0;
    for neighbor in table.iter() {
        let stats = neighbor.queue.drain_and_discard()?;
        if stats.count > 0 {
            println!("{}: {} packets left at teardown", neighbor.dest, stats.count);
        }
        leftover += stats.count;
    }

    let accepted = accepted.load(Ordering::SeqCst);
    println!(
        "accepted {} packets: {} sent, {} reaped, {} left over; {} dropped on overflow",
        accepted,
        sent,
        reaped,
        leftover,
        overflowed.load(Ordering::SeqCst)
    );
    assert_eq!(
        accepted,
        sent + reaped + leftover,
        "pending queues lost track of packets"
    );
    Ok(())
}
