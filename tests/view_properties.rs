use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use taskpad::view::{compare_tasks, count_tasks};
use taskpad::{
    compute_view, Filter, MemoryStore, SortBy, SortOrder, Task, TaskRepository, TaskStatus,
    ViewCriteria,
};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs)
}

prop_compose! {
    fn arb_task()(
        title in "[a-zA-Z ]{0,6}[a-zA-Z][a-zA-Z ]{0,6}",
        description in proptest::option::of("[a-zA-Z ]{0,12}"),
        created in 0i64..20,
        done in any::<bool>(),
    ) -> Task {
        let mut task = Task::new(&title, description.as_deref(), at(created)).unwrap();
        if done {
            task.toggle(at(created + 5));
        }
        task
    }
}

fn arb_criteria() -> impl Strategy<Value = ViewCriteria> {
    (
        prop_oneof![Just(Filter::All), Just(Filter::Pending), Just(Filter::Completed)],
        "[a-zA-Z ]{0,3}",
        prop_oneof![Just(SortBy::CreatedAt), Just(SortBy::Status)],
        prop_oneof![Just(SortOrder::Asc), Just(SortOrder::Desc)],
    )
        .prop_map(|(filter, search, sort_by, sort_order)| {
            ViewCriteria::default()
                .with_filter(filter)
                .with_search(search)
                .with_sorting(sort_by, sort_order)
        })
}

proptest! {
    #[test]
    fn view_is_a_subset_matching_every_predicate(
        tasks in proptest::collection::vec(arb_task(), 0..12),
        criteria in arb_criteria(),
    ) {
        let view = compute_view(&tasks, &criteria);
        let needle = criteria.search_query.trim().to_lowercase();

        prop_assert!(view.len() <= tasks.len());
        for task in &view {
            prop_assert!(tasks.contains(task));
            prop_assert!(criteria.filter.admits(task.status));
            prop_assert!(needle.is_empty() || task.matches_query(&needle));
        }

        let expected = tasks
            .iter()
            .filter(|t| criteria.filter.admits(t.status))
            .filter(|t| needle.is_empty() || t.matches_query(&needle))
            .count();
        prop_assert_eq!(view.len(), expected);
    }

    #[test]
    fn view_is_sorted_and_stable(
        tasks in proptest::collection::vec(arb_task(), 0..12),
        criteria in arb_criteria(),
    ) {
        let view = compute_view(&tasks, &criteria);
        let original_index = |task: &Task| tasks.iter().position(|t| t.id == task.id).unwrap();

        for pair in view.windows(2) {
            let ordering = compare_tasks(&pair[0], &pair[1], criteria.sort_by, criteria.sort_order);
            prop_assert_ne!(ordering, std::cmp::Ordering::Greater);
            if ordering == std::cmp::Ordering::Equal {
                prop_assert!(original_index(&pair[0]) < original_index(&pair[1]));
            }
        }
    }

    #[test]
    fn view_leaves_input_untouched(
        tasks in proptest::collection::vec(arb_task(), 0..8),
        criteria in arb_criteria(),
    ) {
        let before = tasks.clone();
        let _ = compute_view(&tasks, &criteria);
        prop_assert_eq!(before, tasks);
    }

    #[test]
    fn saved_tasks_load_back_unchanged(tasks in proptest::collection::vec(arb_task(), 0..8)) {
        let mut repository = TaskRepository::with_default_key(MemoryStore::new());
        repository.try_save(&tasks).unwrap();
        prop_assert_eq!(repository.load(), tasks);
    }

    #[test]
    fn counts_partition_by_status(tasks in proptest::collection::vec(arb_task(), 0..12)) {
        let counts = count_tasks(&tasks);
        prop_assert_eq!(counts.pending + counts.completed, counts.total);
        let completed = tasks.iter().filter(|t| t.status == TaskStatus::Completed).count();
        prop_assert_eq!(counts.completed, completed);
    }

    #[test]
    fn generated_ids_are_unique(count in 1usize..64) {
        let tasks: Vec<Task> = (0..count)
            .map(|i| Task::new("same title", None, at(i as i64)).unwrap())
            .collect();
        let mut ids: Vec<_> = tasks.iter().map(|t| t.id).collect();
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), count);
    }
}
