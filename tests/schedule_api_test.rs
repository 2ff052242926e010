// ==========================================
// 排程API测试
// ==========================================
// 覆盖: 排程号生成 / 发布条件 / 编入作业约束 / 分页查询
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod schedule_api_test {
    use crate::test_helpers::*;
    use chrono::NaiveDate;
    use paper_slitting::api::{JobFilter, ScheduleFilter};
    use paper_slitting::config::config_keys;
    use paper_slitting::{JobStatus, ScheduleStatus, StockStatus};

    // ==========================================
    // 测试1: 排程号按日期递增
    // ==========================================
    #[test]
    fn test_schedule_no_sequence_per_date() {
        let (_temp_file, _db_path, state) = setup_app();

        let first = state
            .schedule_api
            .create_schedule(production_date(), Some("早班"), "planner")
            .unwrap();
        let second = state
            .schedule_api
            .create_schedule(production_date(), None, "planner")
            .unwrap();
        let next_day = state
            .schedule_api
            .create_schedule(NaiveDate::from_ymd_opt(2024, 6, 2).unwrap(), None, "planner")
            .unwrap();

        assert_eq!(first.schedule_no, "SL-20240601-001");
        assert_eq!(second.schedule_no, "SL-20240601-002");
        assert_eq!(next_day.schedule_no, "SL-20240602-001");
        assert_eq!(first.status, ScheduleStatus::Draft);
        assert_eq!(first.memo.as_deref(), Some("早班"));

        state
            .config_manager
            .set_global_config_value(config_keys::SCHEDULE_NO_PREFIX, "FJ")
            .unwrap();
        let prefixed = state
            .schedule_api
            .create_schedule(production_date(), None, "planner")
            .unwrap();
        assert_eq!(prefixed.schedule_no, "FJ-20240601-003");
    }

    // ==========================================
    // 测试2: 空排程不能发布
    // ==========================================
    #[test]
    fn test_publish_requires_jobs() {
        let (_temp_file, _db_path, state) = setup_app();
        let schedule = state
            .schedule_api
            .create_schedule(production_date(), None, "planner")
            .unwrap();

        let detail = state.schedule_api.get_schedule_detail(&schedule.schedule_id).unwrap();
        assert!(!detail.can_publish);

        let err = state
            .schedule_api
            .publish_schedule(&schedule.schedule_id, "planner")
            .unwrap_err();
        assert!(err.is_validation(), "unexpected error: {}", err);
        let detail = state.schedule_api.get_schedule_detail(&schedule.schedule_id).unwrap();
        assert_eq!(detail.schedule.status, ScheduleStatus::Draft);
    }

    // ==========================================
    // 测试3: 发布后不能再编入作业，也不能重复发布
    // ==========================================
    #[test]
    fn test_add_job_after_publish_is_rejected() {
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
                item_job(&machine.machine_id, "I1", 1200, 2, &[("I2", 600, 2), ("I3", 600, 2)]),
                "planner",
            )
            .unwrap();
        assert_eq!(job.seq_no, 1);
        assert_eq!(job.status, JobStatus::Pending);

        let published = state
            .schedule_api
            .publish_schedule(&schedule.schedule_id, "planner")
            .unwrap();
        assert_eq!(published.status, ScheduleStatus::Published);
        assert_eq!(published.published_by.as_deref(), Some("planner"));

        let err = state
            .schedule_api
            .add_job(
                &schedule.schedule_id,
                item_job(&machine.machine_id, "I1", 1200, 1, &[("I2", 600, 1)]),
                "planner",
            )
            .unwrap_err();
        assert!(err.is_invalid_transition(), "unexpected error: {}", err);

        assert!(state
            .schedule_api
            .publish_schedule(&schedule.schedule_id, "planner")
            .unwrap_err()
            .is_invalid_transition());
    }

    // ==========================================
    // 测试4: 编入作业的校验
    // ==========================================
    #[test]
    fn test_add_job_validation() {
        let (_temp_file, db_path, state) = setup_app();
        let machine = seed_machine(&state, "M1");
        let schedule = state
            .schedule_api
            .create_schedule(production_date(), None, "planner")
            .unwrap();

        // 未登记的机台
        let err = state
            .schedule_api
            .add_job(
                &schedule.schedule_id,
                item_job("no-such-machine", "I1", 1200, 1, &[("I2", 600, 1)]),
                "planner",
            )
            .unwrap_err();
        assert!(err.is_validation());

        // 计划产出宽于母卷
        let err = state
            .schedule_api
            .add_job(
                &schedule.schedule_id,
                item_job(&machine.machine_id, "I1", 1200, 1, &[("I2", 1300, 1)]),
                "planner",
            )
            .unwrap_err();
        assert!(err.is_validation());

        // 母卷寻址作业: 母卷已被预留后不能再编入
        let parent = seed_parent_stock(&db_path, "I1", 1200);
        state
            .schedule_api
            .add_job(
                &schedule.schedule_id,
                stock_job(&machine.machine_id, &parent.stock_id),
                "planner",
            )
            .unwrap();
        assert_eq!(load_stock(&db_path, &parent.stock_id).status, StockStatus::Reserved);
        let err = state
            .schedule_api
            .add_job(
                &schedule.schedule_id,
                stock_job(&machine.machine_id, &parent.stock_id),
                "planner",
            )
            .unwrap_err();
        assert!(err.is_conflict(), "unexpected error: {}", err);

        let detail = state.schedule_api.get_schedule_detail(&schedule.schedule_id).unwrap();
        assert_eq!(detail.total_jobs, 1);
    }

    // ==========================================
    // 测试5: 排程分页与过滤
    // ==========================================
    #[test]
    fn test_list_schedules_filter_and_page() {
        let (_temp_file, _db_path, state) = setup_app();
        let machine = seed_machine(&state, "M1");
        for day in 1..=3 {
            state
                .schedule_api
                .create_schedule(
                    NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
                    Some(if day == 2 { "加急订单" } else { "常规" }),
                    "planner",
                )
                .unwrap();
        }
        let page = state
            .schedule_api
            .list_schedules(&ScheduleFilter::default())
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.limit, 50);
        // 日期倒序
        assert_eq!(page.items[0].schedule.schedule_no, "SL-20240603-001");

        let page = state
            .schedule_api
            .list_schedules(&ScheduleFilter {
                limit: Some(2),
                offset: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].schedule.schedule_no, "SL-20240601-001");

        let page = state
            .schedule_api
            .list_schedules(&ScheduleFilter {
                keyword: Some("加急".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 1);
        let urgent = page.items[0].schedule.clone();

        state
            .schedule_api
            .add_job(
                &urgent.schedule_id,
                item_job(&machine.machine_id, "I1", 1200, 1, &[("I2", 600, 1)]),
                "planner",
            )
            .unwrap();
        state
            .schedule_api
            .publish_schedule(&urgent.schedule_id, "planner")
            .unwrap();

        let page = state
            .schedule_api
            .list_schedules(&ScheduleFilter {
                status: Some(ScheduleStatus::Published),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].total_jobs, 1);
        assert!(!page.items[0].can_publish);

        let page = state
            .schedule_api
            .list_schedules(&ScheduleFilter {
                date_from: NaiveDate::from_ymd_opt(2024, 6, 2),
                date_to: NaiveDate::from_ymd_opt(2024, 6, 3),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 2);

        // 非法分页与日期区间
        assert!(state
            .schedule_api
            .list_schedules(&ScheduleFilter {
                limit: Some(0),
                ..Default::default()
            })
            .unwrap_err()
            .is_validation());
        assert!(state
            .schedule_api
            .list_schedules(&ScheduleFilter {
                date_from: NaiveDate::from_ymd_opt(2024, 6, 3),
                date_to: NaiveDate::from_ymd_opt(2024, 6, 1),
                ..Default::default()
            })
            .unwrap_err()
            .is_validation());
    }

    // ==========================================
    // 测试6: 作业查询
    // ==========================================
    #[test]
    fn test_list_jobs_by_status_and_machine() {
        let (_temp_file, _db_path, state) = setup_app();
        let (schedule_id, job_id, machine_id) = running_item_job(&state, 1, &[("I2", 600, 2)]);

        let page = state
            .job_api
            .list_jobs(&JobFilter {
                status: Some(JobStatus::InProgress),
                machine_id: Some(machine_id.clone()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].job.job_id, job_id);
        assert_eq!(page.items[0].schedule_no, "SL-20240601-001");
        assert_eq!(page.items[0].scheduled_date, production_date());

        let page = state
            .job_api
            .list_jobs(&JobFilter {
                schedule_id: Some(schedule_id),
                status: Some(JobStatus::Approved),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());
    }

    // ==========================================
    // 测试7: 未全部审批的排程不能完成
    // ==========================================
    #[test]
    fn test_complete_schedule_requires_all_approved() {
        let (_temp_file, _db_path, state) = setup_app();
        let (schedule_id, _job_id, _machine_id) = running_item_job(&state, 1, &[("I2", 600, 2)]);

        let err = state
            .schedule_api
            .complete_schedule(&schedule_id, "planner")
            .unwrap_err();
        assert!(err.is_validation());

        let draft = state
            .schedule_api
            .create_schedule(production_date(), None, "planner")
            .unwrap();
        assert!(state
            .schedule_api
            .complete_schedule(&draft.schedule_id, "planner")
            .unwrap_err()
            .is_invalid_transition());
    }
}
