// Room search session: owns the filter criteria, turns every change into one
// catalog fetch and keeps only the newest query's results visible

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogError, RoomCatalog};
use crate::filters::{CatalogQuery, FilterCriteria, FilterError, SortOption};
use crate::models::Room;

// What the listing currently shows
#[derive(Debug, Clone, PartialEq)]
pub enum ResultView {
    NotLoaded,
    Loading { query: CatalogQuery },
    Loaded { query: CatalogQuery, rooms: Vec<Room> },
    Failed { query: CatalogQuery, error: CatalogError },
}

impl ResultView {
    pub fn rooms(&self) -> &[Room] {
        match self {
            ResultView::Loaded { rooms, .. } => rooms,
            _ => &[],
        }
    }
}

// A query tagged with the criteria generation it was built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub generation: u64,
    pub query: CatalogQuery,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Applied { rooms: usize },
    // A newer query was issued while this one was in flight
    Superseded,
    Failed(CatalogError),
}

struct SearchState {
    criteria: FilterCriteria,
    generation: u64,
    view: ResultView,
}

pub struct RoomSearch {
    catalog: Arc<dyn RoomCatalog>,
    state: Mutex<SearchState>,
}

impl RoomSearch {
    pub fn new(catalog: Arc<dyn RoomCatalog>) -> Self {
        Self {
            catalog,
            state: Mutex::new(SearchState {
                criteria: FilterCriteria::default(),
                generation: 0,
                view: ResultView::NotLoaded,
            }),
        }
    }

    pub fn criteria(&self) -> FilterCriteria {
        self.state.lock().criteria.clone()
    }

    pub fn view(&self) -> ResultView {
        self.state.lock().view.clone()
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    // Fetches for the current criteria, e.g. on first load or retry
    pub async fn refresh(&self) -> SearchOutcome {
        let ticket = self.reissue(|_| {});
        self.run(ticket).await
    }

    pub async fn toggle_room_type(
        &self,
        room_type: &str,
        selected: bool,
    ) -> Result<SearchOutcome, FilterError> {
        debug!(room_type, selected, "room type toggled");
        let ticket = self.issue(|criteria| criteria.set_room_type(room_type, selected).map(drop))?;
        Ok(self.run(ticket).await)
    }

    pub async fn toggle_price_range(
        &self,
        label: &str,
        selected: bool,
    ) -> Result<SearchOutcome, FilterError> {
        debug!(label, selected, "price range toggled");
        let ticket = self.issue(|criteria| criteria.set_price_range(label, selected).map(drop))?;
        Ok(self.run(ticket).await)
    }

    pub async fn select_sort(&self, option: Option<SortOption>) -> SearchOutcome {
        debug!(?option, "sort option selected");
        let ticket = self.reissue(|criteria| {
            criteria.select_sort(option);
        });
        self.run(ticket).await
    }

    // Resets all three dimensions in one step, followed by a single fetch
    pub async fn clear(&self) -> SearchOutcome {
        info!("clearing all filters");
        let ticket = self.reissue(FilterCriteria::clear);
        self.run(ticket).await
    }

    /// Applies `mutate` to a copy of the criteria and, if it succeeds, makes
    /// the copy current and issues a ticket for the new query. A failed
    /// mutation changes nothing and issues no ticket.
    pub fn issue<F>(&self, mutate: F) -> Result<SearchTicket, FilterError>
    where
        F: FnOnce(&mut FilterCriteria) -> Result<(), FilterError>,
    {
        let mut state = self.state.lock();
        let mut next = state.criteria.clone();
        mutate(&mut next)?;

        state.criteria = next;
        Ok(Self::next_ticket(&mut state))
    }

    fn reissue(&self, mutate: impl FnOnce(&mut FilterCriteria)) -> SearchTicket {
        let mut state = self.state.lock();
        mutate(&mut state.criteria);
        Self::next_ticket(&mut state)
    }

    fn next_ticket(state: &mut SearchState) -> SearchTicket {
        state.generation += 1;
        let query = state.criteria.to_query();
        state.view = ResultView::Loading {
            query: query.clone(),
        };

        SearchTicket {
            generation: state.generation,
            query,
        }
    }

    /// Records the result of a ticket's fetch. Results for anything but the
    /// latest ticket are dropped.
    pub fn complete(
        &self,
        ticket: SearchTicket,
        result: Result<Vec<Room>, CatalogError>,
    ) -> SearchOutcome {
        let mut state = self.state.lock();
        if ticket.generation != state.generation {
            debug!(
                stale = ticket.generation,
                current = state.generation,
                "discarding superseded search response"
            );
            return SearchOutcome::Superseded;
        }

        match result {
            Ok(rooms) => {
                let count = rooms.len();
                info!(rooms = count, query = ?ticket.query, "search results loaded");
                state.view = ResultView::Loaded {
                    query: ticket.query,
                    rooms,
                };
                SearchOutcome::Applied { rooms: count }
            }
            Err(err) => {
                warn!(error = %err, query = ?ticket.query, "room search failed");
                state.view = ResultView::Failed {
                    query: ticket.query,
                    error: err.clone(),
                };
                SearchOutcome::Failed(err)
            }
        }
    }

    async fn run(&self, ticket: SearchTicket) -> SearchOutcome {
        debug!(generation = ticket.generation, query = ?ticket.query, "fetching rooms");
        let result = self.catalog.search(&ticket.query).await;
        self.complete(ticket, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_backend::{sample_room, MockBackend, ServerMode};
    use std::time::Duration;

    fn backend() -> Arc<MockBackend> {
        let backend = MockBackend::new();
        backend.add_room(sample_room("r1", "Deluxe Room", "12,000"));
        backend.add_room(sample_room("r2", "Family Room", "6,000"));
        backend.add_room(sample_room("r3", "Deluxe Room", "3,000"));
        Arc::new(backend)
    }

    #[tokio::test]
    async fn test_refresh_loads_all_rooms() {
        let backend = backend();
        let search = RoomSearch::new(backend.clone());

        assert_eq!(search.view(), ResultView::NotLoaded);
        assert_eq!(search.refresh().await, SearchOutcome::Applied { rooms: 3 });
        assert_eq!(search.view().rooms().len(), 3);
        assert_eq!(backend.search_queries(), vec![CatalogQuery::default()]);
    }

    #[tokio::test]
    async fn test_each_mutation_fetches_once() {
        let backend = backend();
        let search = RoomSearch::new(backend.clone());

        search.toggle_room_type("Deluxe Room", true).await.unwrap();
        search.toggle_price_range("0 to 5000", true).await.unwrap();
        search.select_sort(Some(SortOption::PriceLowToHigh)).await;

        let queries = backend.search_queries();
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[0].room_types, vec!["Deluxe Room".to_string()]);
        assert_eq!(queries[1].max_price, Some(5000));
        assert_eq!(queries[2].sort_by, Some(SortOption::PriceLowToHigh));

        let ids: Vec<String> = search.view().rooms().iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["r3".to_string()]);
    }

    #[tokio::test]
    async fn test_clear_fetches_once_with_empty_query() {
        let backend = backend();
        let search = RoomSearch::new(backend.clone());

        search.toggle_room_type("Deluxe Room", true).await.unwrap();
        search.toggle_price_range("0 to 5000", true).await.unwrap();
        search.select_sort(Some(SortOption::NewestFirst)).await;
        let before = backend.search_count();

        assert_eq!(search.clear().await, SearchOutcome::Applied { rooms: 3 });
        assert!(search.criteria().is_empty());
        assert_eq!(backend.search_count(), before + 1);
        assert_eq!(backend.search_queries().last(), Some(&CatalogQuery::default()));
    }

    #[tokio::test]
    async fn test_invalid_mutation_does_not_fetch() {
        let backend = backend();
        let search = RoomSearch::new(backend.clone());

        let result = search.toggle_price_range("whatever", true).await;
        assert!(matches!(result, Err(FilterError::InvalidPriceRange(_))));
        assert_eq!(backend.search_count(), 0);
        assert_eq!(search.generation(), 0);
    }

    #[tokio::test]
    async fn test_latest_query_wins_when_earlier_response_arrives_late() {
        let backend = backend();
        // First search is slow, second is fast
        backend.queue_search_delays(vec![Duration::from_millis(150), Duration::ZERO]);
        let search = RoomSearch::new(backend.clone());

        let (first, second) = tokio::join!(
            search.toggle_room_type("Family Room", true),
            search.toggle_room_type("Deluxe Room", true)
        );

        assert_eq!(first.unwrap(), SearchOutcome::Superseded);
        assert_eq!(second.unwrap(), SearchOutcome::Applied { rooms: 3 });

        match search.view() {
            ResultView::Loaded { query, rooms } => {
                assert_eq!(
                    query.room_types,
                    vec!["Deluxe Room".to_string(), "Family Room".to_string()]
                );
                assert_eq!(rooms.len(), 3);
            }
            other => panic!("unexpected view: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stale_ticket_is_ignored() {
        let backend = backend();
        let search = RoomSearch::new(backend.clone());

        let stale = search.issue(|c| c.set_room_type("Family Room", true).map(drop)).unwrap();
        let fresh = search.issue(|c| c.set_room_type("Deluxe Room", true).map(drop)).unwrap();

        assert_eq!(
            search.complete(fresh.clone(), Ok(vec![sample_room("r1", "Deluxe Room", "1")])),
            SearchOutcome::Applied { rooms: 1 }
        );
        assert_eq!(search.complete(stale, Ok(Vec::new())), SearchOutcome::Superseded);
        assert_eq!(search.view().rooms().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_distinct_from_empty_result() {
        let backend = backend();
        let search = RoomSearch::new(backend.clone());

        search.toggle_room_type("Ocean View Room", true).await.unwrap();
        assert_eq!(search.view().rooms().len(), 0);
        assert!(matches!(search.view(), ResultView::Loaded { .. }));

        backend.set_mode(ServerMode::CompleteOutage);
        let outcome = search.refresh().await;
        assert!(matches!(
            outcome,
            SearchOutcome::Failed(CatalogError::CatalogUnavailable(_))
        ));
        assert!(matches!(search.view(), ResultView::Failed { .. }));

        // Retry after recovery
        backend.set_mode(ServerMode::Normal);
        assert_eq!(search.refresh().await, SearchOutcome::Applied { rooms: 0 });
    }
}
