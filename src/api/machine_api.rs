// ==========================================
// 纸卷分切生产系统 - 机台登记 API
// ==========================================
// 职责: 机台登记、查询、状态维护
// ==========================================

use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{require_actor, require_non_empty};
use crate::domain::machine::Machine;
use crate::domain::types::MachineStatus;
use crate::repository::job_repo::JobRepository;
use crate::repository::machine_repo::MachineRepository;
use crate::repository::unit_of_work::UnitOfWork;

pub struct MachineApi {
    uow: Arc<UnitOfWork>,
}

impl MachineApi {
    pub fn new(uow: Arc<UnitOfWork>) -> Self {
        Self { uow }
    }

    /// 登记机台（初始状态 IDLE）
    pub fn register_machine(&self, machine_code: &str, name: &str) -> ApiResult<Machine> {
        require_non_empty(machine_code, "机台代码")?;
        require_non_empty(name, "机台名称")?;

        let machine = self.uow.execute(|tx| {
            let repo = MachineRepository::new(tx);
            if repo.find_by_code(machine_code.trim())?.is_some() {
                return Err(ApiError::Conflict(format!(
                    "机台代码{}已存在",
                    machine_code.trim()
                )));
            }
            let machine = Machine {
                machine_id: uuid::Uuid::new_v4().to_string(),
                machine_code: machine_code.trim().to_string(),
                name: name.trim().to_string(),
                status: MachineStatus::Idle,
                updated_at: super::current_time(),
            };
            repo.insert(&machine)?;
            Ok(machine)
        })?;

        tracing::info!(
            machine_id = %machine.machine_id,
            machine_code = %machine.machine_code,
            "机台已登记"
        );
        Ok(machine)
    }

    pub fn get_machine(&self, machine_id: &str) -> ApiResult<Machine> {
        require_non_empty(machine_id, "机台ID")?;
        self.uow.read(|conn| {
            MachineRepository::new(conn)
                .find_by_id(machine_id)?
                .ok_or_else(|| ApiError::NotFound(format!("Machine(id={})不存在", machine_id)))
        })
    }

    pub fn list_machines(&self) -> ApiResult<Vec<Machine>> {
        self.uow
            .read(|conn| Ok(MachineRepository::new(conn).list_all()?))
    }

    /// 人工维护机台状态
    ///
    /// # 规则
    /// - 机台上仍有执行中的作业时，不能转入 MAINTENANCE 或 IDLE
    pub fn set_machine_status(
        &self,
        machine_id: &str,
        status: MachineStatus,
        actor: &str,
    ) -> ApiResult<Machine> {
        require_non_empty(machine_id, "机台ID")?;
        require_actor(actor)?;

        let machine = self.uow.execute(|tx| {
            let repo = MachineRepository::new(tx);
            let machine = repo
                .find_by_id(machine_id)?
                .ok_or_else(|| ApiError::NotFound(format!("Machine(id={})不存在", machine_id)))?;

            if status != MachineStatus::Running {
                let running_jobs =
                    JobRepository::new(tx).count_in_progress_on_machine(machine_id, None)?;
                if running_jobs > 0 {
                    return Err(ApiError::ValidationError(format!(
                        "机台{}仍有{}个执行中的作业，不能置为{}",
                        machine.machine_code, running_jobs, status
                    )));
                }
            }

            let now = super::current_time();
            repo.update_status(machine_id, status, now)?;
            Ok(Machine {
                status,
                updated_at: now,
                ..machine
            })
        })?;

        tracing::info!(
            machine_id = %machine.machine_id,
            status = %status,
            actor = actor,
            "机台状态已更新"
        );
        Ok(machine)
    }
}
