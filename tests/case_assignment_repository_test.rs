// ==========================================
// 人工分配仓储集成测试
// ==========================================
// 职责: 验证整单替换的事务性、修订号与顺序
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod case_assignment_repository_test {
    use rental_case_labels::domain::{AssignedContent, CaseAssignmentRecord, ItemId};
    use rental_case_labels::engine::AssignmentStore;
    use rental_case_labels::repository::{CaseAssignmentRepository, RepositoryError};

    use std::time::{Duration, Instant};

    use crate::test_helpers::{create_test_db, open_shared};

    fn record(container: usize, name: &str, contents: &[(usize, &str)]) -> CaseAssignmentRecord {
        CaseAssignmentRecord {
            container_item_id: ItemId(container),
            container_name: name.to_string(),
            content_list: contents
                .iter()
                .map(|(id, name)| AssignedContent {
                    name: name.to_string(),
                    quantity: 1,
                    source_item_id: ItemId(*id),
                })
                .collect(),
        }
    }

    #[test]
    fn test_replace_then_load_preserves_order() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let repo = CaseAssignmentRepository::new(open_shared(&db_path));

        let records = vec![
            record(4, "Rack", &[(1, "Mic"), (0, "Amp")]),
            record(2, "Trunk", &[(3, "Cable")]),
        ];
        let revision = repo.replace("u1", "o1", 0, &records).unwrap();
        assert_eq!(revision, 1);

        let saved = repo.find_by_order("u1", "o1").unwrap();
        assert_eq!(saved.revision, 1);
        assert_eq!(saved.records, records);

        // 其他用户、其他订单互不可见
        assert!(repo.find_by_order("u2", "o1").unwrap().records.is_empty());
        assert!(repo.find_by_order("u1", "o2").unwrap().records.is_empty());
    }

    #[test]
    fn test_replace_overwrites_whole_order() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let repo = CaseAssignmentRepository::new(open_shared(&db_path));

        repo.replace("u1", "o1", 0, &[record(0, "A", &[(1, "x")]), record(2, "B", &[])])
            .unwrap();
        let revision = repo.replace("u1", "o1", 1, &[record(2, "B", &[(1, "x")])]).unwrap();
        assert_eq!(revision, 2);

        let saved = repo.find_by_order("u1", "o1").unwrap();
        assert_eq!(saved.records, vec![record(2, "B", &[(1, "x")])]);

        // 空替换 = 清空
        repo.replace("u1", "o1", 2, &[]).unwrap();
        let saved = repo.find_by_order("u1", "o1").unwrap();
        assert!(saved.records.is_empty());
        assert_eq!(saved.revision, 3);
    }

    #[test]
    fn test_stale_revision_is_rejected_without_writing() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let repo = CaseAssignmentRepository::new(open_shared(&db_path));

        repo.replace("u1", "o1", 0, &[record(0, "A", &[(1, "x")])]).unwrap();
        let err = repo
            .replace("u1", "o1", 0, &[record(2, "B", &[])])
            .unwrap_err();
        match err {
            RepositoryError::OptimisticLockFailure { expected, actual, .. } => {
                assert_eq!(expected, 0);
                assert_eq!(actual, 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let saved = repo.find_by_order("u1", "o1").unwrap();
        assert_eq!(saved.records, vec![record(0, "A", &[(1, "x")])]);
    }

    #[test]
    fn test_failed_insert_rolls_back_delete() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let repo = CaseAssignmentRepository::new(open_shared(&db_path));

        let original = vec![record(0, "A", &[(1, "x")])];
        repo.replace("u1", "o1", 0, &original).unwrap();

        // 同一箱体出现两次 -> 主键冲突,整个替换回滚
        let broken = vec![record(2, "B", &[]), record(2, "B", &[(1, "x")])];
        let err = repo.replace("u1", "o1", 1, &broken).unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));

        let saved = repo.find_by_order("u1", "o1").unwrap();
        assert_eq!(saved.revision, 1);
        assert_eq!(saved.records, original);
    }

    #[tokio::test]
    async fn test_store_trait_delegates_to_repository() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let repo = CaseAssignmentRepository::new(open_shared(&db_path));
        let store: &dyn AssignmentStore = &repo;

        let revision = store
            .replace_assignments("u1", "o1", 0, &[record(0, "A", &[])])
            .await
            .unwrap();
        let saved = store.load_assignments("u1", "o1").await.unwrap();
        assert_eq!(saved.revision, revision);
        assert_eq!(saved.records.len(), 1);
    }

    #[test]
    fn test_replace_waits_for_competing_writer() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let repo = CaseAssignmentRepository::new(open_shared(&db_path));

        // 另一连接持有写锁,150ms 后释放
        let other = rusqlite::Connection::open(&db_path).unwrap();
        other.execute_batch("BEGIN IMMEDIATE").unwrap();
        let releaser = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(150));
            other.execute_batch("COMMIT").unwrap();
        });

        let started = Instant::now();
        let revision = repo.replace("u1", "o1", 0, &[record(0, "A", &[(1, "x")])]).unwrap();
        releaser.join().unwrap();

        assert_eq!(revision, 1);
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(repo.find_by_order("u1", "o1").unwrap().records.len(), 1);
    }
}
