//! In-process rank group, each rank is a thread and every ordered pair of ranks shares a
//! FIFO channel.
use crossbeam::channel::{unbounded, Receiver, Sender};
use itertools::Itertools;

use crate::sorting::collector::GatherPlan;
use crate::traits::{
    transport::{Batch, Transport},
    types::{MessageTag, Rank, SortError, Value, ROOT_RANK},
};

#[derive(Debug)]
enum Message {
    Count(usize),
    Numbers(Vec<Value>),
    Value(Value),
    Stop,
    Barrier,
    Gather(Vec<Value>),
}

impl Message {
    fn describe(&self) -> String {
        match self {
            Message::Count(_) => format!("{:?}", MessageTag::Count),
            Message::Numbers(_) => format!("{:?}", MessageTag::Numbers),
            Message::Value(_) => format!("{:?}", MessageTag::Value),
            Message::Stop => format!("{:?}", MessageTag::Stop),
            Message::Barrier => "Barrier".to_string(),
            Message::Gather(_) => "Gather".to_string(),
        }
    }
}

/// One rank's handle on an in-process group.
///
/// Sends never block. Dropping a handle disconnects its outgoing channels, so ranks waiting
/// on it fail with [`SortError::Transport`] instead of hanging.
pub struct LocalTransport {
    rank: Rank,
    size: Rank,
    /// Outgoing channel to each rank, indexed by destination
    outgoing: Vec<Sender<Message>>,
    /// Incoming channel from each rank, indexed by source
    incoming: Vec<Receiver<Message>>,
}

impl LocalTransport {
    /// Build the handles for a group of `n_ranks` ranks, in rank order.
    pub fn group(n_ranks: Rank) -> Result<Vec<LocalTransport>, SortError> {
        if n_ranks < 1 {
            return Err(SortError::InvalidInput(format!(
                "rank count must be at least 1, got {}",
                n_ranks
            )));
        }
        let n = n_ranks as usize;

        // channels[source][destination]
        let channels = (0..n)
            .map(|_| (0..n).map(|_| unbounded::<Message>()).collect_vec())
            .collect_vec();

        let transports = (0..n)
            .map(|rank| LocalTransport {
                rank: rank as Rank,
                size: n_ranks,
                outgoing: (0..n).map(|dst| channels[rank][dst].0.clone()).collect(),
                incoming: (0..n).map(|src| channels[src][rank].1.clone()).collect(),
            })
            .collect();

        Ok(transports)
    }

    fn send(&self, destination: Rank, message: Message) -> Result<(), SortError> {
        let sender = self.outgoing.get(destination as usize).ok_or_else(|| {
            SortError::Transport(format!("no rank {} in a group of {}", destination, self.size))
        })?;
        sender.send(message).map_err(|e| {
            SortError::Transport(format!(
                "rank {} could not send {} to rank {}, receiver is gone",
                self.rank,
                e.0.describe(),
                destination
            ))
        })
    }

    fn receive(&self, source: Rank) -> Result<Message, SortError> {
        let receiver = self.incoming.get(source as usize).ok_or_else(|| {
            SortError::Transport(format!("no rank {} in a group of {}", source, self.size))
        })?;
        receiver.recv().map_err(|_| {
            SortError::Transport(format!(
                "rank {} lost its connection to rank {}",
                self.rank, source
            ))
        })
    }

    fn unexpected(&self, source: Rank, expected: &str, got: &Message) -> SortError {
        SortError::Transport(format!(
            "rank {} expected {} from rank {} but received {}",
            self.rank,
            expected,
            source,
            got.describe()
        ))
    }
}

impl Transport for LocalTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> Rank {
        self.size
    }

    fn dispatch(&self, batches: &[Batch<'_>]) -> Result<(), SortError> {
        for batch in batches {
            self.send(batch.destination, Message::Count(batch.values.len()))?;
            self.send(batch.destination, Message::Numbers(batch.values.to_vec()))?;
        }
        Ok(())
    }

    fn receive_count(&self, source: Rank) -> Result<usize, SortError> {
        match self.receive(source)? {
            Message::Count(count) => Ok(count),
            other => Err(self.unexpected(source, "Count", &other)),
        }
    }

    fn receive_values(&self, source: Rank, _count: usize) -> Result<Vec<Value>, SortError> {
        match self.receive(source)? {
            Message::Numbers(values) => Ok(values),
            other => Err(self.unexpected(source, "Numbers", &other)),
        }
    }

    fn send_value(&self, destination: Rank, value: Value) -> Result<(), SortError> {
        self.send(destination, Message::Value(value))
    }

    fn send_stop(&self, destination: Rank) -> Result<(), SortError> {
        self.send(destination, Message::Stop)
    }

    fn receive_streamed(&self, source: Rank) -> Result<Option<Value>, SortError> {
        match self.receive(source)? {
            Message::Value(value) => Ok(Some(value)),
            Message::Stop => Ok(None),
            other => Err(self.unexpected(source, "Value or Stop", &other)),
        }
    }

    fn barrier(&self) -> Result<(), SortError> {
        let others = (0..self.size).filter(|&r| r != self.rank).collect_vec();
        for &other in others.iter() {
            self.send(other, Message::Barrier)?;
        }
        for &other in others.iter() {
            match self.receive(other)? {
                Message::Barrier => {}
                unexpected => return Err(self.unexpected(other, "Barrier", &unexpected)),
            }
        }
        Ok(())
    }

    fn gather_counts(&self, count: usize) -> Result<Option<Vec<usize>>, SortError> {
        if self.rank != ROOT_RANK {
            self.send(ROOT_RANK, Message::Count(count))?;
            return Ok(None);
        }

        let mut counts = vec![count];
        for source in 1..self.size {
            match self.receive(source)? {
                Message::Count(c) => counts.push(c),
                other => return Err(self.unexpected(source, "Count", &other)),
            }
        }
        Ok(Some(counts))
    }

    fn gather_values_into_root(
        &self,
        local: &[Value],
        plan: &GatherPlan,
        out: &mut [Value],
    ) -> Result<(), SortError> {
        if out.len() < plan.total() {
            return Err(SortError::InvalidInput(format!(
                "gather destination holds {} values, plan needs {}",
                out.len(),
                plan.total()
            )));
        }

        let own = plan.slot(ROOT_RANK);
        out[own].copy_from_slice(local);

        for source in 1..self.size {
            let values = match self.receive(source)? {
                Message::Gather(values) => values,
                other => return Err(self.unexpected(source, "Gather", &other)),
            };
            let slot = plan.slot(source);
            if slot.len() != values.len() {
                return Err(SortError::Transport(format!(
                    "rank {} contributed {} values, expected {}",
                    source,
                    values.len(),
                    slot.len()
                )));
            }
            out[slot].copy_from_slice(&values);
        }
        Ok(())
    }

    fn gather_values_into(&self, local: &[Value]) -> Result<(), SortError> {
        self.send(ROOT_RANK, Message::Gather(local.to_vec()))
    }
}

/// Run `f` once per rank of a fresh in-process group, each rank on its own scoped thread.
///
/// Returns every rank's result in rank order. If any rank fails, the most informative
/// error is returned: transport errors are usually other ranks noticing the failure.
pub fn run_local_group<R, F>(n_ranks: Rank, f: F) -> Result<Vec<R>, SortError>
where
    R: Send,
    F: Fn(&LocalTransport) -> Result<R, SortError> + Sync,
{
    let transports = LocalTransport::group(n_ranks)?;

    let results = crossbeam::thread::scope(|s| {
        let f = &f;
        let handles = transports
            .into_iter()
            .map(|transport| s.spawn(move |_| f(&transport)))
            .collect_vec();

        handles
            .into_iter()
            .enumerate()
            .map(|(rank, h)| {
                h.join().unwrap_or_else(|_| {
                    Err(SortError::Failed(format!("rank {} panicked", rank)))
                })
            })
            .collect_vec()
    })
    .map_err(|_| SortError::Failed("rank group panicked".to_string()))?;

    let (oks, errs): (Vec<_>, Vec<_>) = results.into_iter().partition(|r| r.is_ok());
    if errs.is_empty() {
        return Ok(oks.into_iter().flatten().collect());
    }

    let mut errs = errs.into_iter().filter_map(|r| r.err()).collect_vec();
    let root_cause = errs
        .iter()
        .position(|e| !matches!(e, SortError::Transport(_)))
        .unwrap_or(0);
    Err(errs.swap_remove(root_cause))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_batches_arrive_in_order() {
        let received = run_local_group(3, |t| {
            if t.is_root() {
                let a = [1, 2, 3];
                let b: [Value; 0] = [];
                t.dispatch(&[
                    Batch {
                        destination: 1,
                        values: &a,
                    },
                    Batch {
                        destination: 2,
                        values: &b,
                    },
                ])?;
                Ok(vec![])
            } else {
                let count = t.receive_count(ROOT_RANK)?;
                let values = t.receive_values(ROOT_RANK, count)?;
                assert_eq!(values.len(), count);
                Ok(values)
            }
        })
        .unwrap();

        assert_eq!(received[1], vec![1, 2, 3]);
        assert!(received[2].is_empty());
    }

    #[test]
    fn test_gather_places_by_displacement() {
        let gathered = run_local_group(3, |t| {
            let local = vec![t.rank() as Value; t.rank() as usize + 1];
            let counts = t.gather_counts(local.len())?;
            if let Some(counts) = counts {
                let plan = GatherPlan::from_counts(counts);
                let mut out = vec![0; plan.total()];
                t.gather_values_into_root(&local, &plan, &mut out)?;
                Ok(out)
            } else {
                t.gather_values_into(&local)?;
                Ok(vec![])
            }
        })
        .unwrap();

        assert_eq!(gathered[0], vec![0, 1, 1, 2, 2, 2]);
    }

    #[test]
    fn test_barrier_round_trips() {
        let passed = run_local_group(4, |t| {
            t.barrier()?;
            t.barrier()?;
            Ok(t.rank())
        })
        .unwrap();
        assert_eq!(passed, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_failed_rank_does_not_hang_group() {
        let result = run_local_group(3, |t| {
            if t.rank() == 2 {
                return Err(SortError::Failed("rank 2 gave up".to_string()));
            }
            t.barrier()?;
            Ok(())
        });

        match result {
            Err(SortError::Failed(msg)) => assert_eq!(msg, "rank 2 gave up"),
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_invalid_group_size() {
        assert!(LocalTransport::group(0).is_err());
    }
}
