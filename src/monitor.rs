//! Downstream stand-in: drains every topic and reports what arrives.

use std::{
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Select};

use crate::{
    config::TopicNames,
    messages::{Message, Topic},
    publisher::{Subscribers, take_latest},
};

const REPORT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct TopicStats {
    received: u64,
}

/// Spawns the monitor. It exits once every publisher side is dropped.
pub fn start_monitor(subscribers: Subscribers, names: TopicNames) -> thread::JoinHandle<()> {
    thread::spawn(move || run_monitor(subscribers.into_receivers(), &names))
}

fn run_monitor(receivers: Vec<(Topic, Receiver<Message>)>, names: &TopicNames) {
    let mut stats: Vec<TopicStats> = receivers.iter().map(|_| TopicStats::default()).collect();
    let mut select = Select::new();
    for (_, rx) in &receivers {
        select.recv(rx);
    }

    let mut live = receivers.len();
    let mut last_report = Instant::now();

    while live > 0 {
        if let Ok(oper) = select.select_timeout(REPORT_INTERVAL) {
            let index = oper.index();
            let (topic, rx) = &receivers[index];
            match oper.recv(rx) {
                Ok(message) => {
                    let (latest, taken) = take_latest(rx, message);
                    stats[index].received += taken;
                    log::debug!("{}: {}", names.name(*topic), latest.summary());
                }
                Err(_) => {
                    select.remove(index);
                    live -= 1;
                }
            }
        }

        if last_report.elapsed() >= REPORT_INTERVAL {
            report(&receivers, &mut stats, names, last_report.elapsed());
            last_report = Instant::now();
        }
    }

    log::info!("all publishers closed, monitor exiting");
}

fn report(
    receivers: &[(Topic, Receiver<Message>)],
    stats: &mut [TopicStats],
    names: &TopicNames,
    elapsed: Duration,
) {
    let secs = elapsed.as_secs_f64().max(f64::EPSILON);
    for ((topic, _), topic_stats) in receivers.iter().zip(stats.iter_mut()) {
        log::info!(
            "{}: {} msgs ({:.1}/s)",
            names.name(*topic),
            topic_stats.received,
            topic_stats.received as f64 / secs
        );
        topic_stats.received = 0;
    }
}
