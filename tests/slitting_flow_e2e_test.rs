// ==========================================
// 分切全流程 E2E 测试
// ==========================================
// 覆盖: 排程 → 作业 → 作业卷 → 产出 → 审批入库 → 差异分析
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod slitting_flow_e2e_test {
    use crate::test_helpers::*;
    use paper_slitting::{
        JobCompletion, JobStatus, MachineStatus, RollStatus, ScheduleStatus, StockCondition,
        StockStatus,
    };

    // ==========================================
    // 测试1: 品目/宽度寻址作业，两卷四产出，审批后入库
    // ==========================================
    #[test]
    fn test_item_job_two_rolls_full_flow() {
        let (_temp_file, db_path, state) = setup_app();
        let s1 = seed_parent_stock(&db_path, "I1", 1200);
        let s2 = seed_parent_stock(&db_path, "I1", 1200);

        let (schedule_id, job_id, machine_id) =
            running_item_job(&state, 2, &[("I2", 600, 2), ("I3", 600, 2)]);

        let machine = state.machine_api.get_machine(&machine_id).unwrap();
        assert_eq!(machine.status, MachineStatus::Running);
        let schedule = state.schedule_api.get_schedule_detail(&schedule_id).unwrap();
        assert_eq!(schedule.schedule.status, ScheduleStatus::InProgress);

        let detail = state.job_api.get_job_detail(&job_id).unwrap();
        let p1 = detail.planned_outputs[0].planned_output_id.clone();
        let p2 = detail.planned_outputs[1].planned_output_id.clone();

        // 两个母卷依次登记、分切、完成
        for stock_id in [&s1.stock_id, &s2.stock_id] {
            let roll = state
                .roll_api
                .register_roll(&job_id, stock_id, None, "op-01")
                .unwrap();
            assert_eq!(roll.status, RollStatus::Registered);
            assert_eq!(load_stock(&db_path, stock_id).status, StockStatus::Reserved);

            state.roll_api.start_roll(&job_id, &roll.roll_id, "op-01").unwrap();
            state
                .output_api
                .record_output(&job_id, &roll.roll_id, output("I2", 600, 1, Some(p1.as_str())), "op-01")
                .unwrap();
            state
                .output_api
                .record_output(&job_id, &roll.roll_id, output("I3", 600, 1, Some(p2.as_str())), "op-01")
                .unwrap();
            let done = state
                .roll_api
                .complete_roll(&job_id, &roll.roll_id, None, "op-01")
                .unwrap();
            assert_eq!(done.status, RollStatus::Completed);
        }

        let job = state
            .job_api
            .complete_job(&job_id, JobCompletion::FromRolls { memo: None }, "op-01")
            .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(
            state.machine_api.get_machine(&machine_id).unwrap().status,
            MachineStatus::Idle
        );

        let result = state.job_api.approve_job(&job_id, "qa").unwrap();
        assert_eq!(result.job.status, JobStatus::Approved);
        assert_eq!(result.created_stock.len(), 4);
        assert!(result
            .created_stock
            .iter()
            .all(|s| s.condition == StockCondition::Slitted && s.width_mm == 600));
        assert_eq!(result.consumed_stock_ids, vec![s1.stock_id.clone(), s2.stock_id.clone()]);
        assert_eq!(result.loss_quantity, 0);

        assert_eq!(load_stock(&db_path, &s1.stock_id).status, StockStatus::Consumed);
        assert_eq!(load_stock(&db_path, &s2.stock_id).status, StockStatus::Consumed);
        assert_eq!(stock_created_by_job(&db_path, &job_id).len(), 4);

        // 每条产出都回写了库存ID
        let outputs = state.output_api.list_outputs(&job_id).unwrap();
        assert!(outputs.iter().all(|o| o.created_stock_id.is_some()));

        let report = state.job_api.get_variance_report(&job_id).unwrap();
        assert_eq!(report.lines.len(), 2);
        assert!(report.lines.iter().all(|l| l.quantity_variance == 0));
        assert_eq!(report.summary.planned_quantity, 4);
        assert_eq!(report.summary.total_actual_quantity, 4);
        assert_eq!(report.summary.variance_percent, 0.0);

        // 排程内唯一作业已审批，排程自动完成
        let schedule = state.schedule_api.get_schedule_detail(&schedule_id).unwrap();
        assert_eq!(schedule.schedule.status, ScheduleStatus::Completed);
        assert_eq!(schedule.approved_jobs, 1);
    }

    // ==========================================
    // 测试2: 母卷寻址（旧版）作业，一次性提交产出
    // ==========================================
    #[test]
    fn test_stock_addressed_job_inline_flow() {
        let (_temp_file, db_path, state) = setup_app();
        let parent = seed_parent_stock(&db_path, "I1", 1200);
        let machine = seed_machine(&state, "M2");

        let schedule = state
            .schedule_api
            .create_schedule(production_date(), Some("旧版"), "planner")
            .unwrap();
        let job = state
            .schedule_api
            .add_job(
                &schedule.schedule_id,
                stock_job(&machine.machine_id, &parent.stock_id),
                "planner",
            )
            .unwrap();
        // 编入即预留
        assert_eq!(load_stock(&db_path, &parent.stock_id).status, StockStatus::Reserved);

        state
            .schedule_api
            .publish_schedule(&schedule.schedule_id, "planner")
            .unwrap();
        state.job_api.mark_ready(&job.job_id, "op-02").unwrap();
        state.job_api.start_job(&job.job_id, "op-02").unwrap();

        let completed = state
            .job_api
            .complete_job(
                &job.job_id,
                JobCompletion::Inline {
                    memo: Some("一次完工".to_string()),
                    outputs: vec![
                        output("I2", 580, 2, None),
                        output("I3", 580, 1, None),
                        loss("I1", 40, 1),
                    ],
                },
                "op-02",
            )
            .unwrap();
        assert_eq!(completed.status, JobStatus::Completed);
        assert_eq!(completed.completion_memo.as_deref(), Some("一次完工"));

        let result = state.job_api.approve_job(&job.job_id, "qa").unwrap();
        assert_eq!(result.created_stock.len(), 2);
        assert_eq!(result.consumed_stock_ids, vec![parent.stock_id.clone()]);
        assert_eq!(result.loss_quantity, 1);
        assert_eq!(load_stock(&db_path, &parent.stock_id).status, StockStatus::Consumed);

        // 无计划产出: 全部计入计划外
        let report = state.job_api.get_variance_report(&job.job_id).unwrap();
        assert!(report.lines.is_empty());
        assert_eq!(report.summary.unplanned_quantity, 3);
        assert_eq!(report.summary.loss_quantity, 1);

        let detail = state.job_api.get_job_detail(&job.job_id).unwrap();
        assert!(detail.rolls.is_empty());
        assert_eq!(detail.unrolled_outputs.len(), 3);
    }

    // ==========================================
    // 测试3: 欠产差异
    // ==========================================
    #[test]
    fn test_variance_reports_shortfall() {
        let (_temp_file, db_path, state) = setup_app();
        let s1 = seed_parent_stock(&db_path, "I1", 1200);
        let (_schedule_id, job_id, _machine_id) = running_item_job(&state, 1, &[("I2", 600, 10)]);
        let planned = state.job_api.get_job_detail(&job_id).unwrap().planned_outputs;

        let roll = state
            .roll_api
            .register_roll(&job_id, &s1.stock_id, None, "op-01")
            .unwrap();
        state.roll_api.start_roll(&job_id, &roll.roll_id, "op-01").unwrap();
        state
            .output_api
            .record_output(
                &job_id,
                &roll.roll_id,
                output("I2", 600, 8, Some(planned[0].planned_output_id.as_str())),
                "op-01",
            )
            .unwrap();

        let report = state.job_api.get_variance_report(&job_id).unwrap();
        assert_eq!(report.lines[0].actual_quantity, 8);
        assert_eq!(report.lines[0].quantity_variance, -2);
        assert_eq!(report.lines[0].variance_percent, -20.0);
    }
}
