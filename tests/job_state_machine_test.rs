// ==========================================
// 作业状态机测试
// ==========================================
// 覆盖: 非法转换 / 完工前置条件 / 审批原子性 / 机台联动
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod job_state_machine_test {
    use crate::test_helpers::*;
    use paper_slitting::app::AppState;
    use paper_slitting::repository::{
        RepositoryError, RepositoryResult, SqliteMachineRegistry, SqliteStockLedger, StockLedger,
    };
    use paper_slitting::{
        ApiError, JobCompletion, JobStatus, MachineStatus, NewStock, RollStatus, ScheduleStatus,
        Stock, StockStatus,
    };
    use rusqlite::Connection;
    use std::sync::Arc;

    /// 消耗母卷时失败的库存台账
    struct ConsumeFailingLedger {
        inner: SqliteStockLedger,
    }

    impl StockLedger for ConsumeFailingLedger {
        fn find_stock(&self, conn: &Connection, stock_id: &str) -> RepositoryResult<Option<Stock>> {
            self.inner.find_stock(conn, stock_id)
        }

        fn find_available_parent_stock(
            &self,
            conn: &Connection,
            item_id: Option<&str>,
            width_mm: Option<i32>,
            width_tolerance_mm: i32,
        ) -> RepositoryResult<Vec<Stock>> {
            self.inner
                .find_available_parent_stock(conn, item_id, width_mm, width_tolerance_mm)
        }

        fn reserve_stock(&self, conn: &Connection, stock_id: &str) -> RepositoryResult<()> {
            self.inner.reserve_stock(conn, stock_id)
        }

        fn release_stock(&self, conn: &Connection, stock_id: &str) -> RepositoryResult<()> {
            self.inner.release_stock(conn, stock_id)
        }

        fn consume_stock(&self, _conn: &Connection, stock_id: &str) -> RepositoryResult<()> {
            Err(RepositoryError::InternalError(format!(
                "库存系统不可用: {}",
                stock_id
            )))
        }

        fn create_stock(&self, conn: &Connection, new_stock: &NewStock) -> RepositoryResult<Stock> {
            self.inner.create_stock(conn, new_stock)
        }
    }

    /// 跑完一个单卷作业直到 COMPLETED
    fn completed_single_roll_job(state: &AppState, db_path: &str) -> (String, String) {
        let s1 = seed_parent_stock(db_path, "I1", 1200);
        let (_, job_id, _) = running_item_job(state, 1, &[("I2", 600, 2)]);
        let roll = state
            .roll_api
            .register_roll(&job_id, &s1.stock_id, None, "op-01")
            .unwrap();
        state.roll_api.start_roll(&job_id, &roll.roll_id, "op-01").unwrap();
        state
            .output_api
            .record_output(&job_id, &roll.roll_id, output("I2", 600, 2, None), "op-01")
            .unwrap();
        state
            .roll_api
            .complete_roll(&job_id, &roll.roll_id, None, "op-01")
            .unwrap();
        state
            .job_api
            .complete_job(&job_id, JobCompletion::FromRolls { memo: None }, "op-01")
            .unwrap();
        (job_id, s1.stock_id)
    }

    // ==========================================
    // 测试1: 重复审批被拒绝，不重复入库
    // ==========================================
    #[test]
    fn test_double_approve_is_rejected_without_double_posting() {
        let (_temp_file, db_path, state) = setup_app();
        let (job_id, _) = completed_single_roll_job(&state, &db_path);

        let first = state.job_api.approve_job(&job_id, "qa").unwrap();
        assert_eq!(first.created_stock.len(), 1);

        let err = state.job_api.approve_job(&job_id, "qa").unwrap_err();
        match err {
            ApiError::InvalidStateTransition { from, action, .. } => {
                assert_eq!(from, "APPROVED");
                assert_eq!(action, "approve");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(stock_created_by_job(&db_path, &job_id).len(), 1);
    }

    // ==========================================
    // 测试2: 没有已完成的卷不能完工
    // ==========================================
    #[test]
    fn test_complete_without_completed_roll_is_rejected() {
        let (_temp_file, _db_path, state) = setup_app();
        let (_, job_id, _) = running_item_job(&state, 1, &[("I2", 600, 2)]);

        let err = state
            .job_api
            .complete_job(&job_id, JobCompletion::FromRolls { memo: None }, "op-01")
            .unwrap_err();
        assert!(err.is_validation(), "unexpected error: {}", err);
        assert_eq!(state.job_api.get_job(&job_id).unwrap().status, JobStatus::InProgress);
    }

    // ==========================================
    // 测试3: 仍有分切中的卷不能完工
    // ==========================================
    #[test]
    fn test_complete_with_roll_in_progress_is_rejected() {
        let (_temp_file, db_path, state) = setup_app();
        let s1 = seed_parent_stock(&db_path, "I1", 1200);
        let (_, job_id, _) = running_item_job(&state, 1, &[("I2", 600, 2)]);
        let roll = state
            .roll_api
            .register_roll(&job_id, &s1.stock_id, None, "op-01")
            .unwrap();
        state.roll_api.start_roll(&job_id, &roll.roll_id, "op-01").unwrap();

        let err = state
            .job_api
            .complete_job(&job_id, JobCompletion::FromRolls { memo: None }, "op-01")
            .unwrap_err();
        assert!(err.is_validation());
    }

    // ==========================================
    // 测试4: 完工时未开工的卷自动取消并释放母卷
    // ==========================================
    #[test]
    fn test_complete_cancels_registered_rolls() {
        let (_temp_file, db_path, state) = setup_app();
        let s1 = seed_parent_stock(&db_path, "I1", 1200);
        let s2 = seed_parent_stock(&db_path, "I1", 1200);
        let (_, job_id, _) = running_item_job(&state, 2, &[("I2", 600, 2)]);

        let first = state
            .roll_api
            .register_roll(&job_id, &s1.stock_id, None, "op-01")
            .unwrap();
        let spare = state
            .roll_api
            .register_roll(&job_id, &s2.stock_id, None, "op-01")
            .unwrap();
        state.roll_api.start_roll(&job_id, &first.roll_id, "op-01").unwrap();
        state
            .roll_api
            .complete_roll(&job_id, &first.roll_id, None, "op-01")
            .unwrap();

        state
            .job_api
            .complete_job(
                &job_id,
                JobCompletion::FromRolls {
                    memo: Some("提前收卷".to_string()),
                },
                "op-01",
            )
            .unwrap();

        let rolls = state.roll_api.list_rolls(&job_id).unwrap();
        let spare = rolls.iter().find(|r| r.roll_id == spare.roll_id).unwrap();
        assert_eq!(spare.status, RollStatus::Cancelled);
        assert_eq!(load_stock(&db_path, &s2.stock_id).status, StockStatus::Available);
        assert_eq!(load_stock(&db_path, &s1.stock_id).status, StockStatus::Reserved);
    }

    // ==========================================
    // 测试5: 同一作业只能有一个分切中的卷
    // ==========================================
    #[test]
    fn test_second_roll_start_is_invalid_transition() {
        let (_temp_file, db_path, state) = setup_app();
        let s1 = seed_parent_stock(&db_path, "I1", 1200);
        let s2 = seed_parent_stock(&db_path, "I1", 1200);
        let (_, job_id, _) = running_item_job(&state, 2, &[("I2", 600, 2)]);

        let r1 = state
            .roll_api
            .register_roll(&job_id, &s1.stock_id, None, "op-01")
            .unwrap();
        let r2 = state
            .roll_api
            .register_roll(&job_id, &s2.stock_id, None, "op-01")
            .unwrap();
        state.roll_api.start_roll(&job_id, &r1.roll_id, "op-01").unwrap();

        let err = state
            .roll_api
            .start_roll(&job_id, &r2.roll_id, "op-01")
            .unwrap_err();
        assert!(err.is_invalid_transition(), "unexpected error: {}", err);

        state
            .roll_api
            .complete_roll(&job_id, &r1.roll_id, None, "op-01")
            .unwrap();
        let started = state.roll_api.start_roll(&job_id, &r2.roll_id, "op-01").unwrap();
        assert_eq!(started.status, RollStatus::InProgress);
    }

    // ==========================================
    // 测试6: 台账失败时审批整体回滚
    // ==========================================
    #[test]
    fn test_ledger_failure_rolls_back_approval() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let state = AppState::with_collaborators(
            db_path.clone(),
            Arc::new(ConsumeFailingLedger {
                inner: SqliteStockLedger,
            }),
            Arc::new(SqliteMachineRegistry),
        )
        .unwrap();
        let (job_id, parent_id) = completed_single_roll_job(&state, &db_path);

        let err = state.job_api.approve_job(&job_id, "qa").unwrap_err();
        match &err {
            ApiError::DependencyFailure {
                dependency,
                operation,
                ..
            } => {
                assert_eq!(dependency, "StockLedger");
                assert_eq!(operation, "consume_stock");
            }
            other => panic!("unexpected error: {}", other),
        }

        assert_eq!(state.job_api.get_job(&job_id).unwrap().status, JobStatus::Completed);
        assert!(stock_created_by_job(&db_path, &job_id).is_empty());
        assert_eq!(load_stock(&db_path, &parent_id).status, StockStatus::Reserved);
        let outputs = state.output_api.list_outputs(&job_id).unwrap();
        assert!(outputs.iter().all(|o| o.created_stock_id.is_none()));
    }

    // ==========================================
    // 测试7: 非相邻转换被拒绝
    // ==========================================
    #[test]
    fn test_non_adjacent_transitions_are_rejected() {
        let (_temp_file, _db_path, state) = setup_app();
        let machine = seed_machine(&state, "M1");
        let schedule = state
            .schedule_api
            .create_schedule(production_date(), None, "planner")
            .unwrap();
        let job = state
            .schedule_api
            .add_job(
                &schedule.schedule_id,
                item_job(&machine.machine_id, "I1", 1200, 1, &[("I2", 600, 2)]),
                "planner",
            )
            .unwrap();

        // 排程未发布
        let err = state.job_api.mark_ready(&job.job_id, "op-01").unwrap_err();
        assert!(err.is_validation());

        // PENDING 不能直接开工/完工/审批
        assert!(state
            .job_api
            .start_job(&job.job_id, "op-01")
            .unwrap_err()
            .is_invalid_transition());
        assert!(state
            .job_api
            .complete_job(&job.job_id, JobCompletion::FromRolls { memo: None }, "op-01")
            .unwrap_err()
            .is_invalid_transition());
        assert!(state
            .job_api
            .approve_job(&job.job_id, "qa")
            .unwrap_err()
            .is_invalid_transition());
        assert_eq!(state.job_api.get_job(&job.job_id).unwrap().status, JobStatus::Pending);
    }

    // ==========================================
    // 测试8: 完工方式必须与寻址方式匹配
    // ==========================================
    #[test]
    fn test_inline_completion_on_item_job_is_rejected() {
        let (_temp_file, _db_path, state) = setup_app();
        let (_, job_id, _) = running_item_job(&state, 1, &[("I2", 600, 2)]);

        let err = state
            .job_api
            .complete_job(
                &job_id,
                JobCompletion::Inline {
                    memo: None,
                    outputs: vec![output("I2", 600, 2, None)],
                },
                "op-01",
            )
            .unwrap_err();
        assert!(err.is_validation());
        assert!(state.output_api.list_outputs(&job_id).unwrap().is_empty());
    }

    // ==========================================
    // 测试9: 维护中的机台不能开工
    // ==========================================
    #[test]
    fn test_machine_in_maintenance_blocks_start() {
        let (_temp_file, _db_path, state) = setup_app();
        let machine = seed_machine(&state, "M1");
        state
            .machine_api
            .set_machine_status(&machine.machine_id, MachineStatus::Maintenance, "maint")
            .unwrap();

        let schedule = state
            .schedule_api
            .create_schedule(production_date(), None, "planner")
            .unwrap();
        let job = state
            .schedule_api
            .add_job(
                &schedule.schedule_id,
                item_job(&machine.machine_id, "I1", 1200, 1, &[("I2", 600, 2)]),
                "planner",
            )
            .unwrap();
        state
            .schedule_api
            .publish_schedule(&schedule.schedule_id, "planner")
            .unwrap();
        state.job_api.mark_ready(&job.job_id, "op-01").unwrap();

        let err = state.job_api.start_job(&job.job_id, "op-01").unwrap_err();
        assert!(err.is_validation());
        assert_eq!(state.job_api.get_job(&job.job_id).unwrap().status, JobStatus::Ready);

        state
            .machine_api
            .set_machine_status(&machine.machine_id, MachineStatus::Idle, "maint")
            .unwrap();
        let started = state.job_api.start_job(&job.job_id, "op-01").unwrap();
        assert_eq!(started.status, JobStatus::InProgress);
        assert_eq!(started.started_by.as_deref(), Some("op-01"));

        // 有执行中的作业时不能转入维护
        assert!(state
            .machine_api
            .set_machine_status(&machine.machine_id, MachineStatus::Maintenance, "maint")
            .unwrap_err()
            .is_validation());
    }

    // ==========================================
    // 测试10: 首个作业开工时排程进入生产中，后续开工不再推进
    // ==========================================
    #[test]
    fn test_first_start_moves_schedule_in_progress() {
        let (_temp_file, db_path, state) = setup_app();
        let s1 = seed_parent_stock(&db_path, "I1", 1200);
        let machine = seed_machine(&state, "M1");
        let schedule = state
            .schedule_api
            .create_schedule(production_date(), None, "planner")
            .unwrap();
        let mut job_ids = Vec::new();
        for _ in 0..2 {
            let job = state
                .schedule_api
                .add_job(
                    &schedule.schedule_id,
                    item_job(&machine.machine_id, "I1", 1200, 1, &[("I2", 600, 2)]),
                    "planner",
                )
                .unwrap();
            job_ids.push(job.job_id);
        }
        state
            .schedule_api
            .publish_schedule(&schedule.schedule_id, "planner")
            .unwrap();
        for job_id in &job_ids {
            state.job_api.mark_ready(job_id, "op-01").unwrap();
        }

        let status_of = |id: &str| state.schedule_api.get_schedule_detail(id).unwrap().schedule.status;
        assert_eq!(status_of(&schedule.schedule_id), ScheduleStatus::Published);

        state.job_api.start_job(&job_ids[0], "op-01").unwrap();
        assert_eq!(status_of(&schedule.schedule_id), ScheduleStatus::InProgress);

        state.job_api.start_job(&job_ids[1], "op-01").unwrap();
        assert_eq!(status_of(&schedule.schedule_id), ScheduleStatus::InProgress);
        assert_eq!(
            state.machine_api.get_machine(&machine.machine_id).unwrap().status,
            MachineStatus::Running
        );

        // 第一个作业完工后机台上仍有执行中的作业
        let roll = state
            .roll_api
            .register_roll(&job_ids[0], &s1.stock_id, None, "op-01")
            .unwrap();
        state.roll_api.start_roll(&job_ids[0], &roll.roll_id, "op-01").unwrap();
        state
            .output_api
            .record_output(&job_ids[0], &roll.roll_id, output("I2", 600, 2, None), "op-01")
            .unwrap();
        state
            .roll_api
            .complete_roll(&job_ids[0], &roll.roll_id, None, "op-01")
            .unwrap();
        state
            .job_api
            .complete_job(&job_ids[0], JobCompletion::FromRolls { memo: None }, "op-01")
            .unwrap();
        assert_eq!(
            state.machine_api.get_machine(&machine.machine_id).unwrap().status,
            MachineStatus::Running
        );
        assert!(state
            .machine_api
            .set_machine_status(&machine.machine_id, MachineStatus::Maintenance, "maint")
            .unwrap_err()
            .is_validation());
    }
}
