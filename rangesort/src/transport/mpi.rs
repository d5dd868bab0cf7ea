//! Rank group backed by an MPI communicator.
use itertools::Itertools;
use mpi::{
    datatype::PartitionMut,
    traits::{Communicator, CommunicatorCollectives, Destination, Root, Source},
    Count, Tag,
};

use crate::sorting::collector::GatherPlan;
use crate::traits::{
    transport::{Batch, Transport},
    types::{MessageTag, Rank, SortError, Value, ROOT_RANK},
};

/// Transport over any MPI communicator, typically a duplicate of the world communicator.
pub struct MpiTransport<'c, C: Communicator> {
    communicator: &'c C,
}

impl<'c, C: Communicator> MpiTransport<'c, C> {
    /// Wrap an initialised communicator.
    pub fn new(communicator: &'c C) -> Self {
        MpiTransport { communicator }
    }

    /// Underlying communicator
    pub fn communicator(&self) -> &'c C {
        self.communicator
    }
}

fn to_count(n: usize) -> Result<Count, SortError> {
    Count::try_from(n).map_err(|_| {
        SortError::InvalidInput(format!("{} values exceed the MPI count range", n))
    })
}

impl<C: Communicator> Transport for MpiTransport<'_, C> {
    fn rank(&self) -> Rank {
        self.communicator.rank()
    }

    fn size(&self) -> Rank {
        self.communicator.size()
    }

    fn dispatch(&self, batches: &[Batch<'_>]) -> Result<(), SortError> {
        let counts = batches
            .iter()
            .map(|b| b.values.len() as Value)
            .collect_vec();
        for b in batches.iter() {
            to_count(b.values.len())?;
        }

        // Post every send before waiting on any of them
        mpi::request::multiple_scope(2 * batches.len(), |scope, coll| {
            for (batch, count) in batches.iter().zip(counts.iter()) {
                let process = self.communicator.process_at_rank(batch.destination);
                let creq = process.immediate_send_with_tag(
                    scope,
                    std::slice::from_ref(count),
                    MessageTag::Count as Tag,
                );
                coll.add(creq);
                let vreq =
                    process.immediate_send_with_tag(scope, batch.values, MessageTag::Numbers as Tag);
                coll.add(vreq);
            }

            let mut complete = vec![];
            coll.wait_all(&mut complete);
        });

        Ok(())
    }

    fn receive_count(&self, source: Rank) -> Result<usize, SortError> {
        let (count, _status) = self
            .communicator
            .process_at_rank(source)
            .receive_with_tag::<Value>(MessageTag::Count as Tag);
        Ok(count as usize)
    }

    fn receive_values(&self, source: Rank, count: usize) -> Result<Vec<Value>, SortError> {
        let mut values = vec![0 as Value; count];
        self.communicator
            .process_at_rank(source)
            .receive_into_with_tag(&mut values[..], MessageTag::Numbers as Tag);
        Ok(values)
    }

    fn send_value(&self, destination: Rank, value: Value) -> Result<(), SortError> {
        self.communicator
            .process_at_rank(destination)
            .send_with_tag(&value, MessageTag::Value as Tag);
        Ok(())
    }

    fn send_stop(&self, destination: Rank) -> Result<(), SortError> {
        self.communicator
            .process_at_rank(destination)
            .send_with_tag(&(0 as Value), MessageTag::Stop as Tag);
        Ok(())
    }

    fn receive_streamed(&self, source: Rank) -> Result<Option<Value>, SortError> {
        let (value, status) = self.communicator.process_at_rank(source).receive::<Value>();
        match status.tag() {
            t if t == MessageTag::Value as Tag => Ok(Some(value)),
            t if t == MessageTag::Stop as Tag => Ok(None),
            t => Err(SortError::Transport(format!(
                "rank {} expected a streamed value from rank {} but received tag {}",
                self.rank(),
                source,
                t
            ))),
        }
    }

    fn barrier(&self) -> Result<(), SortError> {
        self.communicator.barrier();
        Ok(())
    }

    fn gather_counts(&self, count: usize) -> Result<Option<Vec<usize>>, SortError> {
        let count = count as Value;
        if self.rank() == ROOT_RANK {
            let mut counts = vec![0 as Value; self.size() as usize];
            self.communicator
                .this_process()
                .gather_into_root(&count, &mut counts[..]);
            Ok(Some(counts.into_iter().map(|c| c as usize).collect()))
        } else {
            self.communicator
                .process_at_rank(ROOT_RANK)
                .gather_into(&count);
            Ok(None)
        }
    }

    fn gather_values_into_root(
        &self,
        local: &[Value],
        plan: &GatherPlan,
        out: &mut [Value],
    ) -> Result<(), SortError> {
        let total = plan.total();
        if out.len() < total {
            return Err(SortError::InvalidInput(format!(
                "gather destination holds {} values, plan needs {}",
                out.len(),
                total
            )));
        }
        to_count(total)?;

        let counts = plan
            .counts
            .iter()
            .map(|&c| c as Count)
            .collect_vec();
        let displacements = plan
            .displacements
            .iter()
            .map(|&d| d as Count)
            .collect_vec();

        let mut partition = PartitionMut::new(&mut out[..total], counts, &displacements[..]);
        self.communicator
            .this_process()
            .gather_varcount_into_root(local, &mut partition);
        Ok(())
    }

    fn gather_values_into(&self, local: &[Value]) -> Result<(), SortError> {
        to_count(local.len())?;
        self.communicator
            .process_at_rank(ROOT_RANK)
            .gather_varcount_into(local);
        Ok(())
    }
}
