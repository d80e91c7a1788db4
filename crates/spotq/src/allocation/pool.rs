//! Spot pool: the single owned aggregate of spot states and the waiting queue.
//!
//! Every operation validates before it mutates, so an `Err` never leaves the pool
//! partially updated. Callers serialize access (see `SpotService`).

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use super::outcome::{Event, ListedSpot, Listing, SpotError};
use super::queue::WaitingQueue;
use super::spot::{Occupancy, RequesterId, SpotId, SpotState, SpotStatus};

pub type Outcome = Result<Vec<Event>, SpotError>;

#[derive(Debug, Clone)]
pub struct SpotPool {
    spots: Vec<SpotState>,
    queue: WaitingQueue,
}

impl SpotPool {
    /// Create a pool of `num_spots` spots, all available.
    pub fn new(num_spots: usize) -> Self {
        Self {
            spots: vec![SpotState::Available; num_spots],
            queue: WaitingQueue::new(),
        }
    }

    pub fn num_spots(&self) -> usize {
        self.spots.len()
    }

    pub fn state(&self, spot: SpotId) -> Option<&SpotState> {
        self.spots.get(spot.index()).filter(|_| spot.get() >= 1)
    }

    pub fn queue(&self) -> &WaitingQueue {
        &self.queue
    }

    pub fn count(&self, status: SpotStatus) -> usize {
        self.spots.iter().filter(|s| s.status() == status).count()
    }

    /// Spot currently owned by `requester`, if any.
    pub fn spot_of(&self, requester: &RequesterId) -> Option<SpotId> {
        self.spots
            .iter()
            .position(|s| s.is_owned_by(requester))
            .map(SpotId::from_index)
    }

    /// Lowest-numbered available spot. Down spots are never returned.
    pub fn next_available(&self) -> Option<SpotId> {
        self.spots
            .iter()
            .position(SpotState::is_available)
            .map(SpotId::from_index)
    }

    pub fn request(&mut self, requester: RequesterId, now: DateTime<Utc>) -> Outcome {
        if let Some(spot) = self.spot_of(&requester) {
            return Err(SpotError::AlreadyAssigned { requester, spot });
        }

        match self.next_available() {
            Some(spot) => Ok(vec![self.assign(spot, requester, now)]),
            None => {
                if self.queue.push_back(requester.clone()) {
                    tracing::debug!(%requester, position = self.queue.len(), "Queued requester");
                }
                Ok(vec![Event::Queued { requester }])
            }
        }
    }

    pub fn release(&mut self, requester: RequesterId, now: DateTime<Utc>) -> Outcome {
        let spot = self.vacate_owned(&requester)?;

        let mut events = Vec::with_capacity(2);
        let refill = self.fill_from_queue(spot, now);
        let refilled = refill.is_some();
        events.extend(refill);
        events.push(Event::Released { spot, refilled });
        Ok(events)
    }

    /// Give up the held spot while keeping first place in the queue.
    pub fn pass(&mut self, requester: RequesterId, now: DateTime<Utc>) -> Outcome {
        let spot = self.vacate_owned(&requester)?;

        self.queue.push_front(requester.clone());
        let mut events = vec![
            Event::Passed {
                requester: requester.clone(),
                spot,
            },
            Event::PriorityKept { requester },
        ];
        events.extend(self.fill_from_queue(spot, now));
        Ok(events)
    }

    /// Withdraw a spot from circulation.
    ///
    /// The displaced owner's spot is not handed to the queue since it is going
    /// down. If `issuer` is the displaced owner they get the lowest available spot,
    /// or first place in the queue.
    pub fn mark_down(&mut self, spot: u32, issuer: &RequesterId, now: DateTime<Utc>) -> Outcome {
        let spot = self.checked(spot)?;
        let state = &mut self.spots[spot.index()];
        if state.is_down() {
            return Err(SpotError::AlreadyDown { spot });
        }

        let mut events = Vec::new();
        let displaced = match std::mem::replace(state, SpotState::Down) {
            SpotState::Taken(occupancy) => Some(occupancy.owner),
            _ => None,
        };
        tracing::info!(%spot, displaced = ?displaced.as_ref().map(|r| r.as_str()), "Spot marked down");

        if let Some(owner) = &displaced {
            events.push(Event::Displaced {
                owner: owner.clone(),
                spot,
            });
        }
        events.push(Event::MarkedDown { spot });

        if let Some(owner) = displaced.filter(|owner| owner == issuer) {
            match self.next_available() {
                Some(other) => events.push(self.assign(other, owner, now)),
                None => {
                    self.queue.push_front(owner.clone());
                    events.push(Event::PriorityKept { requester: owner });
                }
            }
        }
        Ok(events)
    }

    /// Return a down spot to circulation and fill it from the queue.
    pub fn mark_up(&mut self, spot: u32, now: DateTime<Utc>) -> Outcome {
        let spot = self.checked(spot)?;
        let state = &mut self.spots[spot.index()];
        if !state.is_down() {
            return Err(SpotError::NotDown { spot });
        }
        *state = SpotState::Available;
        tracing::info!(%spot, "Spot marked up");

        let mut events = vec![Event::MarkedUp { spot }];
        events.extend(self.fill_from_queue(spot, now));
        Ok(events)
    }

    pub fn list(&self) -> Listing {
        Listing {
            spots: self
                .spots
                .iter()
                .enumerate()
                .map(|(i, s)| (SpotId::from_index(i), ListedSpot::from(s)))
                .collect(),
            queue: self.queue.iter().cloned().collect(),
        }
    }

    /// Report every taken spot held strictly longer than `threshold`.
    pub fn sweep_overdue(&self, threshold: Duration, now: DateTime<Utc>) -> Vec<Event> {
        let limit = TimeDelta::from_std(threshold).unwrap_or(TimeDelta::MAX);
        let mut events: Vec<Event> = self
            .spots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| {
                let occupancy = s.occupancy()?;
                let held = now - occupancy.assigned_at;
                (held > limit).then(|| Event::Overdue {
                    requester: occupancy.owner.clone(),
                    spot: SpotId::from_index(i),
                    held,
                })
            })
            .collect();

        if events.is_empty() {
            events.push(Event::NoneOverdue { threshold });
        } else {
            tracing::info!(count = events.len(), "Overdue spots found");
        }
        events
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            spots: self
                .spots
                .iter()
                .enumerate()
                .map(|(i, s)| SpotView {
                    id: SpotId::from_index(i),
                    status: s.status(),
                    owner: s.occupancy().map(|o| o.owner.clone()),
                    assigned_at: s.occupancy().map(|o| o.assigned_at),
                })
                .collect(),
            queue: self.queue.iter().cloned().collect(),
        }
    }

    fn checked(&self, spot: u32) -> Result<SpotId, SpotError> {
        if spot == 0 || spot as usize > self.spots.len() {
            return Err(SpotError::InvalidSpot {
                spot,
                num_spots: self.spots.len(),
            });
        }
        Ok(SpotId::new(spot))
    }

    /// Drop the requester's occupancy record, leaving the spot available.
    fn vacate_owned(&mut self, requester: &RequesterId) -> Result<SpotId, SpotError> {
        let spot = self
            .spot_of(requester)
            .ok_or_else(|| SpotError::NotAssigned {
                requester: requester.clone(),
            })?;
        self.spots[spot.index()] = SpotState::Available;
        tracing::debug!(%spot, %requester, "Spot vacated");
        Ok(spot)
    }

    fn assign(&mut self, spot: SpotId, requester: RequesterId, now: DateTime<Utc>) -> Event {
        debug_assert!(self.spots[spot.index()].is_available());
        self.queue.remove(&requester);
        self.spots[spot.index()] = SpotState::Taken(Occupancy {
            owner: requester.clone(),
            assigned_at: now,
        });
        tracing::debug!(%spot, %requester, "Spot assigned");
        Event::Assigned { requester, spot }
    }

    /// Hand an available spot to the head of the queue.
    fn fill_from_queue(&mut self, spot: SpotId, now: DateTime<Utc>) -> Option<Event> {
        if !self.spots[spot.index()].is_available() {
            return None;
        }
        let next = self.queue.pop_front()?;
        Some(self.assign(spot, next, now))
    }
}

/// Serializable view of the pool for the HTTP transport.
#[derive(Debug, Clone, Serialize)]
pub struct PoolSnapshot {
    pub spots: Vec<SpotView>,
    pub queue: Vec<RequesterId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpotView {
    pub id: SpotId,
    pub status: SpotStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<RequesterId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn rid(id: &str) -> RequesterId {
        RequesterId::new(id)
    }

    fn queue_ids(pool: &SpotPool) -> Vec<&str> {
        pool.queue().iter().map(|r| r.as_str()).collect()
    }

    /// Ownership and queue membership never overlap; no one owns two spots.
    fn assert_invariants(pool: &SpotPool) {
        let owners: Vec<_> = pool
            .spots
            .iter()
            .filter_map(|s| s.occupancy().map(|o| o.owner.clone()))
            .collect();
        for (i, owner) in owners.iter().enumerate() {
            assert!(!owners[i + 1..].contains(owner), "{owner} owns two spots");
            assert!(!pool.queue().contains(owner), "{owner} owns and is queued");
        }
    }

    #[test]
    fn new_pool_has_all_spots_available() {
        for n in 1..=5 {
            let pool = SpotPool::new(n);
            assert_eq!(pool.num_spots(), n);
            assert_eq!(pool.count(SpotStatus::Available), n);
            assert!(pool.queue().is_empty());
        }
    }

    #[test]
    fn request_assigns_lowest_available() {
        let mut pool = SpotPool::new(2);
        let events = pool.request(rid("A"), now()).unwrap();
        assert_eq!(
            events,
            [Event::Assigned {
                requester: rid("A"),
                spot: SpotId::new(1)
            }]
        );

        pool.request(rid("B"), now()).unwrap();
        assert_eq!(pool.spot_of(&rid("B")), Some(SpotId::new(2)));

        pool.release(rid("A"), now()).unwrap();
        pool.request(rid("C"), now()).unwrap();
        assert_eq!(pool.spot_of(&rid("C")), Some(SpotId::new(1)));
        assert_invariants(&pool);
    }

    #[test]
    fn request_twice_is_already_assigned() {
        let mut pool = SpotPool::new(2);
        pool.request(rid("A"), now()).unwrap();
        let err = pool.request(rid("A"), now()).unwrap_err();
        assert_eq!(
            err,
            SpotError::AlreadyAssigned {
                requester: rid("A"),
                spot: SpotId::new(1)
            }
        );
        assert_eq!(pool.count(SpotStatus::Taken), 1);
    }

    #[test]
    fn full_pool_queues_in_arrival_order() {
        let mut pool = SpotPool::new(1);
        pool.request(rid("A"), now()).unwrap();
        assert_eq!(
            pool.request(rid("B"), now()).unwrap(),
            [Event::Queued { requester: rid("B") }]
        );
        pool.request(rid("C"), now()).unwrap();
        // A repeat request from a queued requester keeps its place.
        pool.request(rid("B"), now()).unwrap();
        assert_eq!(queue_ids(&pool), ["B", "C"]);
        assert_invariants(&pool);
    }

    #[test]
    fn release_fills_from_queue_front() {
        let mut pool = SpotPool::new(1);
        pool.request(rid("A"), now()).unwrap();
        pool.request(rid("B"), now()).unwrap();
        pool.request(rid("C"), now()).unwrap();

        let events = pool.release(rid("A"), now()).unwrap();
        assert_eq!(
            events,
            [
                Event::Assigned {
                    requester: rid("B"),
                    spot: SpotId::new(1)
                },
                Event::Released {
                    spot: SpotId::new(1),
                    refilled: true
                },
            ]
        );
        assert_eq!(queue_ids(&pool), ["C"]);
        assert_invariants(&pool);
    }

    #[test]
    fn release_with_empty_queue_frees_spot() {
        let mut pool = SpotPool::new(1);
        pool.request(rid("A"), now()).unwrap();
        let events = pool.release(rid("A"), now()).unwrap();
        assert_eq!(
            events,
            [Event::Released {
                spot: SpotId::new(1),
                refilled: false
            }]
        );
        assert_eq!(pool.count(SpotStatus::Available), 1);
    }

    #[test]
    fn release_without_spot_is_not_assigned() {
        let mut pool = SpotPool::new(1);
        assert_eq!(
            pool.release(rid("A"), now()).unwrap_err(),
            SpotError::NotAssigned { requester: rid("A") }
        );
        assert_eq!(
            pool.pass(rid("A"), now()).unwrap_err(),
            SpotError::NotAssigned { requester: rid("A") }
        );
    }

    #[test]
    fn pass_reinserts_at_front_and_reassigns() {
        let mut pool = SpotPool::new(1);
        pool.request(rid("A"), now()).unwrap();
        pool.request(rid("B"), now()).unwrap();

        let later = now() + TimeDelta::hours(1);
        let events = pool.pass(rid("A"), later).unwrap();
        assert_eq!(
            events,
            [
                Event::Passed {
                    requester: rid("A"),
                    spot: SpotId::new(1)
                },
                Event::PriorityKept { requester: rid("A") },
                Event::Assigned {
                    requester: rid("A"),
                    spot: SpotId::new(1)
                },
            ]
        );
        assert_eq!(queue_ids(&pool), ["B"]);
        let occupancy = pool.state(SpotId::new(1)).unwrap().occupancy().unwrap();
        assert_eq!(occupancy.assigned_at, later);
        assert_invariants(&pool);
    }

    #[test]
    fn down_spot_is_never_assigned() {
        let mut pool = SpotPool::new(1);
        pool.mark_down(1, &rid("OP"), now()).unwrap();
        assert_eq!(
            pool.request(rid("A"), now()).unwrap(),
            [Event::Queued { requester: rid("A") }]
        );
        assert!(pool.state(SpotId::new(1)).unwrap().is_down());
    }

    #[test]
    fn mark_down_displaces_owner_without_draining_queue() {
        let mut pool = SpotPool::new(1);
        pool.request(rid("A"), now()).unwrap();
        pool.request(rid("B"), now()).unwrap();

        let events = pool.mark_down(1, &rid("OP"), now()).unwrap();
        assert_eq!(
            events,
            [
                Event::Displaced {
                    owner: rid("A"),
                    spot: SpotId::new(1)
                },
                Event::MarkedDown {
                    spot: SpotId::new(1)
                },
            ]
        );
        assert_eq!(queue_ids(&pool), ["B"]);
        assert_eq!(pool.spot_of(&rid("A")), None);
        assert_invariants(&pool);
    }

    #[test]
    fn mark_down_own_spot_moves_issuer_to_free_spot() {
        let mut pool = SpotPool::new(2);
        pool.request(rid("A"), now()).unwrap();

        let events = pool.mark_down(1, &rid("A"), now()).unwrap();
        assert_eq!(
            events.last(),
            Some(&Event::Assigned {
                requester: rid("A"),
                spot: SpotId::new(2)
            })
        );
        assert_eq!(pool.spot_of(&rid("A")), Some(SpotId::new(2)));
    }

    #[test]
    fn mark_down_own_spot_queues_issuer_at_front() {
        let mut pool = SpotPool::new(1);
        pool.request(rid("A"), now()).unwrap();
        pool.request(rid("B"), now()).unwrap();

        let events = pool.mark_down(1, &rid("A"), now()).unwrap();
        assert_eq!(
            events.last(),
            Some(&Event::PriorityKept { requester: rid("A") })
        );
        assert_eq!(queue_ids(&pool), ["A", "B"]);
        assert_invariants(&pool);
    }

    #[test]
    fn mark_down_by_other_owner_leaves_issuer_in_place() {
        let mut pool = SpotPool::new(2);
        pool.request(rid("A"), now()).unwrap();
        pool.request(rid("B"), now()).unwrap();
        pool.request(rid("C"), now()).unwrap();

        let events = pool.mark_down(1, &rid("B"), now()).unwrap();
        assert_eq!(
            events,
            [
                Event::Displaced {
                    owner: rid("A"),
                    spot: SpotId::new(1)
                },
                Event::MarkedDown {
                    spot: SpotId::new(1)
                },
            ]
        );
        assert_eq!(pool.spot_of(&rid("B")), Some(SpotId::new(2)));
        assert_eq!(pool.spot_of(&rid("A")), None);
        assert_eq!(queue_ids(&pool), ["C"]);
        assert_invariants(&pool);
    }

    #[test]
    fn mark_down_rejects_invalid_and_repeated() {
        let mut pool = SpotPool::new(2);
        assert_eq!(
            pool.mark_down(0, &rid("OP"), now()).unwrap_err(),
            SpotError::InvalidSpot {
                spot: 0,
                num_spots: 2
            }
        );
        assert!(matches!(
            pool.mark_down(3, &rid("OP"), now()),
            Err(SpotError::InvalidSpot { spot: 3, .. })
        ));
        pool.mark_down(2, &rid("OP"), now()).unwrap();
        assert_eq!(
            pool.mark_down(2, &rid("OP"), now()).unwrap_err(),
            SpotError::AlreadyDown {
                spot: SpotId::new(2)
            }
        );
    }

    #[test]
    fn mark_up_restores_and_fills_from_queue() {
        let mut pool = SpotPool::new(1);
        pool.mark_down(1, &rid("OP"), now()).unwrap();
        pool.request(rid("A"), now()).unwrap();

        let events = pool.mark_up(1, now()).unwrap();
        assert_eq!(
            events,
            [
                Event::MarkedUp {
                    spot: SpotId::new(1)
                },
                Event::Assigned {
                    requester: rid("A"),
                    spot: SpotId::new(1)
                },
            ]
        );
        assert!(pool.queue().is_empty());
    }

    #[test]
    fn mark_up_on_live_spot_is_noop() {
        let mut pool = SpotPool::new(2);
        pool.request(rid("A"), now()).unwrap();
        let before = pool.snapshot();

        for spot in [1, 2] {
            assert_eq!(
                pool.mark_up(spot, now()).unwrap_err(),
                SpotError::NotDown {
                    spot: SpotId::new(spot)
                }
            );
        }
        let after = pool.snapshot();
        assert_eq!(
            serde_json::to_value(before).unwrap(),
            serde_json::to_value(after).unwrap()
        );
        assert!(matches!(
            pool.mark_up(7, now()),
            Err(SpotError::InvalidSpot { spot: 7, .. })
        ));
    }

    #[test]
    fn sweep_reports_exactly_overdue_spots() {
        let mut pool = SpotPool::new(3);
        let start = now();
        pool.request(rid("A"), start).unwrap();
        pool.request(rid("B"), start + TimeDelta::hours(2)).unwrap();
        pool.request(rid("C"), start + TimeDelta::minutes(30)).unwrap();

        let threshold = Duration::from_secs(3 * 3600);
        let events = pool.sweep_overdue(threshold, start + TimeDelta::hours(4));
        assert_eq!(
            events,
            [
                Event::Overdue {
                    requester: rid("A"),
                    spot: SpotId::new(1),
                    held: TimeDelta::hours(4)
                },
                Event::Overdue {
                    requester: rid("C"),
                    spot: SpotId::new(3),
                    held: TimeDelta::minutes(210)
                },
            ]
        );
    }

    #[test]
    fn sweep_ignores_fresh_assignments() {
        let mut pool = SpotPool::new(2);
        pool.request(rid("A"), now()).unwrap();
        let threshold = Duration::from_secs(3 * 3600);

        assert_eq!(
            pool.sweep_overdue(threshold, now()),
            [Event::NoneOverdue { threshold }]
        );
        // Exactly at the threshold is not overdue.
        assert_eq!(
            pool.sweep_overdue(threshold, now() + TimeDelta::hours(3)),
            [Event::NoneOverdue { threshold }]
        );
    }

    #[test]
    fn list_reports_spots_and_queue() {
        let mut pool = SpotPool::new(2);
        pool.request(rid("A"), now()).unwrap();
        pool.mark_down(2, &rid("OP"), now()).unwrap();
        pool.request(rid("B"), now()).unwrap();

        let listing = pool.list();
        assert_eq!(
            listing.spots,
            [
                (SpotId::new(1), ListedSpot::Taken(rid("A"))),
                (SpotId::new(2), ListedSpot::Down),
            ]
        );
        assert_eq!(listing.queue, [rid("B")]);
    }

    #[test]
    fn snapshot_serializes_owners_and_queue() {
        let mut pool = SpotPool::new(2);
        pool.request(rid("A"), now()).unwrap();
        pool.mark_down(2, &rid("OP"), now()).unwrap();
        pool.request(rid("B"), now()).unwrap();

        insta::assert_json_snapshot!(pool.snapshot(), @r#"
        {
          "spots": [
            {
              "id": 1,
              "status": "taken",
              "owner": "A",
              "assigned_at": "2023-11-14T22:13:20Z"
            },
            {
              "id": 2,
              "status": "down"
            }
          ],
          "queue": [
            "B"
          ]
        }
        "#);
    }
}
