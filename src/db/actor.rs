use crate::db::create::{
    AbsorbanceCreate, CellGrowthCreate, ExperimentCreate, PlateCreate, PlateExperimentCreate,
    PlateReagentCreate, ReagentCreate, StoredExperiment, UpsertCounts,
};
use crate::db::models::{
    DbAbsorbanceReading, DbCellGrowth, DbExperiment, DbPlate, DbPlateExperimentMap,
    DbPlateReagentMap, DbReagent, ExperimentCostRow, PlateCostRow,
};
use crate::db::{migrate, ops, pool};
use crate::error::PlatelabError;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::SqlitePool;
use tracing::info;

type Reply<T> = RpcReplyPort<Result<T, PlatelabError>>;

#[derive(Debug)]
pub enum DbActorMessage {
    /// Insert a new reagent; fails on a duplicate name.
    CreateReagent(ReagentCreate, Reply<DbReagent>),

    /// Upsert a batch of reagents by name in one transaction.
    UpsertReagents(Vec<ReagentCreate>, Reply<UpsertCounts>),

    GetReagent(i64, Reply<DbReagent>),
    ListReagents(Reply<Vec<DbReagent>>),
    DeleteReagent(i64, Reply<()>),

    CreatePlate(PlateCreate, Reply<DbPlate>),

    FindPlateByLabel(String, Reply<Option<DbPlate>>),

    GetPlate(i64, Reply<DbPlate>),
    ListPlates(Reply<Vec<DbPlate>>),
    DeletePlate(i64, Reply<()>),

    AddPlateReagent(PlateReagentCreate, Reply<DbPlateReagentMap>),
    ListPlateReagents(i64, Reply<Vec<DbPlateReagentMap>>),
    OrphanMappings(Reply<Vec<DbPlateReagentMap>>),

    AddCellGrowth(CellGrowthCreate, Reply<DbCellGrowth>),

    /// Growth rows for a plate, ascending by time index.
    ListCellGrowth(i64, Reply<Vec<DbCellGrowth>>),

    /// Store one export under a plate label, creating the plate with the rows.
    StoreAbsorbance(String, Vec<AbsorbanceCreate>, Reply<(DbPlate, u64)>),
    ListAbsorbance(i64, Reply<Vec<DbAbsorbanceReading>>),

    /// Cost join rows, for one plate or all of them.
    PlateCostRows(Option<i64>, Reply<Vec<PlateCostRow>>),

    /// Upsert an experiment by number and replace its reagent amounts.
    StoreExperiment(ExperimentCreate, Reply<StoredExperiment>),
    GetExperiment(i64, Reply<DbExperiment>),
    ListExperiments(Reply<Vec<DbExperiment>>),
    ExperimentCostRows(i64, Reply<Vec<ExperimentCostRow>>),
    MapPlateExperiment(PlateExperimentCreate, Reply<DbPlateExperimentMap>),
    ListPlateExperiments(i64, Reply<Vec<DbPlateExperimentMap>>),
}

/// Cloneable handle to the database actor: the repository interface the rest
/// of the crate talks to.
#[derive(Clone)]
pub struct DbActorHandle {
    actor: ActorRef<DbActorMessage>,
}

fn rpc_failed(op: &str, e: impl std::fmt::Display) -> PlatelabError {
    PlatelabError::RactorError(format!("DbActor {op} RPC failed: {e}"))
}

impl DbActorHandle {
    pub async fn create_reagent(&self, create: ReagentCreate) -> Result<DbReagent, PlatelabError> {
        ractor::call!(self.actor, DbActorMessage::CreateReagent, create)
            .map_err(|e| rpc_failed("CreateReagent", e))?
    }

    pub async fn upsert_reagents(
        &self,
        reagents: Vec<ReagentCreate>,
    ) -> Result<UpsertCounts, PlatelabError> {
        ractor::call!(self.actor, DbActorMessage::UpsertReagents, reagents)
            .map_err(|e| rpc_failed("UpsertReagents", e))?
    }

    pub async fn get_reagent(&self, id: i64) -> Result<DbReagent, PlatelabError> {
        ractor::call!(self.actor, DbActorMessage::GetReagent, id)
            .map_err(|e| rpc_failed("GetReagent", e))?
    }

    pub async fn list_reagents(&self) -> Result<Vec<DbReagent>, PlatelabError> {
        ractor::call!(self.actor, DbActorMessage::ListReagents)
            .map_err(|e| rpc_failed("ListReagents", e))?
    }

    pub async fn delete_reagent(&self, id: i64) -> Result<(), PlatelabError> {
        ractor::call!(self.actor, DbActorMessage::DeleteReagent, id)
            .map_err(|e| rpc_failed("DeleteReagent", e))?
    }

    pub async fn create_plate(&self, create: PlateCreate) -> Result<DbPlate, PlatelabError> {
        ractor::call!(self.actor, DbActorMessage::CreatePlate, create)
            .map_err(|e| rpc_failed("CreatePlate", e))?
    }

    pub async fn find_plate_by_label(&self, label: &str) -> Result<Option<DbPlate>, PlatelabError> {
        ractor::call!(self.actor, DbActorMessage::FindPlateByLabel, label.to_string())
            .map_err(|e| rpc_failed("FindPlateByLabel", e))?
    }

    pub async fn get_plate(&self, id: i64) -> Result<DbPlate, PlatelabError> {
        ractor::call!(self.actor, DbActorMessage::GetPlate, id)
            .map_err(|e| rpc_failed("GetPlate", e))?
    }

    pub async fn list_plates(&self) -> Result<Vec<DbPlate>, PlatelabError> {
        ractor::call!(self.actor, DbActorMessage::ListPlates)
            .map_err(|e| rpc_failed("ListPlates", e))?
    }

    pub async fn delete_plate(&self, id: i64) -> Result<(), PlatelabError> {
        ractor::call!(self.actor, DbActorMessage::DeletePlate, id)
            .map_err(|e| rpc_failed("DeletePlate", e))?
    }

    pub async fn add_plate_reagent(
        &self,
        create: PlateReagentCreate,
    ) -> Result<DbPlateReagentMap, PlatelabError> {
        ractor::call!(self.actor, DbActorMessage::AddPlateReagent, create)
            .map_err(|e| rpc_failed("AddPlateReagent", e))?
    }

    pub async fn list_plate_reagents(
        &self,
        plate_id: i64,
    ) -> Result<Vec<DbPlateReagentMap>, PlatelabError> {
        ractor::call!(self.actor, DbActorMessage::ListPlateReagents, plate_id)
            .map_err(|e| rpc_failed("ListPlateReagents", e))?
    }

    pub async fn orphan_mappings(&self) -> Result<Vec<DbPlateReagentMap>, PlatelabError> {
        ractor::call!(self.actor, DbActorMessage::OrphanMappings)
            .map_err(|e| rpc_failed("OrphanMappings", e))?
    }

    pub async fn add_cell_growth(
        &self,
        create: CellGrowthCreate,
    ) -> Result<DbCellGrowth, PlatelabError> {
        ractor::call!(self.actor, DbActorMessage::AddCellGrowth, create)
            .map_err(|e| rpc_failed("AddCellGrowth", e))?
    }

    pub async fn list_cell_growth(&self, plate_id: i64) -> Result<Vec<DbCellGrowth>, PlatelabError> {
        ractor::call!(self.actor, DbActorMessage::ListCellGrowth, plate_id)
            .map_err(|e| rpc_failed("ListCellGrowth", e))?
    }

    pub async fn store_absorbance(
        &self,
        label: &str,
        readings: Vec<AbsorbanceCreate>,
    ) -> Result<(DbPlate, u64), PlatelabError> {
        ractor::call!(
            self.actor,
            DbActorMessage::StoreAbsorbance,
            label.to_string(),
            readings
        )
        .map_err(|e| rpc_failed("StoreAbsorbance", e))?
    }

    pub async fn list_absorbance(
        &self,
        plate_id: i64,
    ) -> Result<Vec<DbAbsorbanceReading>, PlatelabError> {
        ractor::call!(self.actor, DbActorMessage::ListAbsorbance, plate_id)
            .map_err(|e| rpc_failed("ListAbsorbance", e))?
    }

    pub async fn plate_cost_rows(
        &self,
        plate_id: Option<i64>,
    ) -> Result<Vec<PlateCostRow>, PlatelabError> {
        ractor::call!(self.actor, DbActorMessage::PlateCostRows, plate_id)
            .map_err(|e| rpc_failed("PlateCostRows", e))?
    }

    pub async fn store_experiment(
        &self,
        create: ExperimentCreate,
    ) -> Result<StoredExperiment, PlatelabError> {
        ractor::call!(self.actor, DbActorMessage::StoreExperiment, create)
            .map_err(|e| rpc_failed("StoreExperiment", e))?
    }

    pub async fn get_experiment(&self, id: i64) -> Result<DbExperiment, PlatelabError> {
        ractor::call!(self.actor, DbActorMessage::GetExperiment, id)
            .map_err(|e| rpc_failed("GetExperiment", e))?
    }

    pub async fn list_experiments(&self) -> Result<Vec<DbExperiment>, PlatelabError> {
        ractor::call!(self.actor, DbActorMessage::ListExperiments)
            .map_err(|e| rpc_failed("ListExperiments", e))?
    }

    pub async fn experiment_cost_rows(
        &self,
        experiment_id: i64,
    ) -> Result<Vec<ExperimentCostRow>, PlatelabError> {
        ractor::call!(self.actor, DbActorMessage::ExperimentCostRows, experiment_id)
            .map_err(|e| rpc_failed("ExperimentCostRows", e))?
    }

    pub async fn map_plate_experiment(
        &self,
        create: PlateExperimentCreate,
    ) -> Result<DbPlateExperimentMap, PlatelabError> {
        ractor::call!(self.actor, DbActorMessage::MapPlateExperiment, create)
            .map_err(|e| rpc_failed("MapPlateExperiment", e))?
    }

    pub async fn list_plate_experiments(
        &self,
        plate_id: i64,
    ) -> Result<Vec<DbPlateExperimentMap>, PlatelabError> {
        ractor::call!(self.actor, DbActorMessage::ListPlateExperiments, plate_id)
            .map_err(|e| rpc_failed("ListPlateExperiments", e))?
    }

    /// Stops the actor and waits for it to close the pool. Calls through any
    /// other clone of this handle fail afterwards.
    pub async fn shutdown(&self) -> Result<(), PlatelabError> {
        self.actor
            .stop_and_wait(None, None)
            .await
            .map_err(|e| rpc_failed("shutdown", e))
    }
}

pub struct DbActorArgs {
    pub database_url: String,
    /// Apply pending migrations before accepting messages.
    pub auto_migrate: bool,
}

struct DbActorState {
    pool: SqlitePool,
}

struct DbActor;

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbActorMessage;
    type State = DbActorState;
    type Arguments = DbActorArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let pool = pool::connect(&args.database_url)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db connect failed: {e}")))?;

        if args.auto_migrate {
            migrate::upgrade(&pool)
                .await
                .map_err(|e| ActorProcessingErr::from(format!("db migration failed: {e}")))?;
        }

        info!(auto_migrate = args.auto_migrate, "DbActor initialized");
        Ok(DbActorState { pool })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let pool = &state.pool;
        match message {
            DbActorMessage::CreateReagent(create, reply) => {
                let _ = reply.send(ops::create_reagent(pool, create).await);
            }
            DbActorMessage::UpsertReagents(reagents, reply) => {
                let _ = reply.send(ops::upsert_reagents_by_name(pool, reagents).await);
            }
            DbActorMessage::GetReagent(id, reply) => {
                let _ = reply.send(ops::get_reagent(pool, id).await);
            }
            DbActorMessage::ListReagents(reply) => {
                let _ = reply.send(ops::list_reagents(pool).await);
            }
            DbActorMessage::DeleteReagent(id, reply) => {
                let _ = reply.send(ops::delete_reagent(pool, id).await);
            }
            DbActorMessage::CreatePlate(create, reply) => {
                let _ = reply.send(ops::create_plate(pool, create).await);
            }
            DbActorMessage::FindPlateByLabel(label, reply) => {
                let _ = reply.send(ops::find_plate_by_label(pool, &label).await);
            }
            DbActorMessage::GetPlate(id, reply) => {
                let _ = reply.send(ops::get_plate(pool, id).await);
            }
            DbActorMessage::ListPlates(reply) => {
                let _ = reply.send(ops::list_plates(pool).await);
            }
            DbActorMessage::DeletePlate(id, reply) => {
                let _ = reply.send(ops::delete_plate(pool, id).await);
            }
            DbActorMessage::AddPlateReagent(create, reply) => {
                let _ = reply.send(ops::add_plate_reagent(pool, create).await);
            }
            DbActorMessage::ListPlateReagents(plate_id, reply) => {
                let _ = reply.send(ops::list_plate_reagents(pool, plate_id).await);
            }
            DbActorMessage::OrphanMappings(reply) => {
                let _ = reply.send(ops::orphan_mappings(pool).await);
            }
            DbActorMessage::AddCellGrowth(create, reply) => {
                let _ = reply.send(ops::add_cell_growth(pool, create).await);
            }
            DbActorMessage::ListCellGrowth(plate_id, reply) => {
                let _ = reply.send(ops::list_cell_growth(pool, plate_id).await);
            }
            DbActorMessage::StoreAbsorbance(label, readings, reply) => {
                let _ = reply.send(ops::store_absorbance(pool, &label, readings).await);
            }
            DbActorMessage::ListAbsorbance(plate_id, reply) => {
                let _ = reply.send(ops::list_absorbance(pool, plate_id).await);
            }
            DbActorMessage::PlateCostRows(plate_id, reply) => {
                let _ = reply.send(ops::plate_cost_rows(pool, plate_id).await);
            }
            DbActorMessage::StoreExperiment(create, reply) => {
                let _ = reply.send(ops::store_experiment(pool, create).await);
            }
            DbActorMessage::GetExperiment(id, reply) => {
                let _ = reply.send(ops::get_experiment(pool, id).await);
            }
            DbActorMessage::ListExperiments(reply) => {
                let _ = reply.send(ops::list_experiments(pool).await);
            }
            DbActorMessage::ExperimentCostRows(experiment_id, reply) => {
                let _ = reply.send(ops::experiment_cost_rows(pool, experiment_id).await);
            }
            DbActorMessage::MapPlateExperiment(create, reply) => {
                let _ = reply.send(ops::map_plate_experiment(pool, create).await);
            }
            DbActorMessage::ListPlateExperiments(plate_id, reply) => {
                let _ = reply.send(ops::list_plate_experiments(pool, plate_id).await);
            }
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.pool.close().await;
        info!("DbActor stopped; pool closed");
        Ok(())
    }
}

/// Spawn the database actor and return a cloneable handle.
///
/// Fails when the database cannot be opened or, with `auto_migrate`, when a
/// migration does not apply cleanly.
pub async fn spawn(database_url: &str, auto_migrate: bool) -> Result<DbActorHandle, PlatelabError> {
    let args = DbActorArgs {
        database_url: database_url.to_string(),
        auto_migrate,
    };
    let (actor, _jh) = ractor::Actor::spawn(None, DbActor, args)
        .await
        .map_err(|e| PlatelabError::RactorError(format!("failed to spawn DbActor: {e}")))?;

    Ok(DbActorHandle { actor })
}
