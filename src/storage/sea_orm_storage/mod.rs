//! SeaORM 存储实现
//!
//! 统一的数据库存储层，支持 SQLite、PostgreSQL 和 MySQL。

mod allocations;
mod assignments;
mod class_users;
mod grades;
mod privacy;
mod users;

use crate::config::AppConfig;
use crate::errors::{DoubleMarkingError, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// SeaORM 存储实现
#[derive(Clone)]
pub struct SeaOrmStorage {
    pub(crate) db: DatabaseConnection,
}

impl SeaOrmStorage {
    /// 创建新的 SeaORM 存储实例
    pub async fn new_async() -> Result<Self> {
        let config = AppConfig::get();
        let db_url = Self::build_database_url(&config.database.url)?;

        // 根据数据库类型选择连接方式
        let db = if db_url.starts_with("sqlite://") {
            Self::connect_sqlite(&db_url, config).await?
        } else {
            Self::connect_generic(&db_url, config).await?
        };

        // 运行迁移
        let storage = Self::from_connection(db).await?;

        info!("SeaORM 存储初始化完成，数据库: {}", db_url);

        Ok(storage)
    }

    /// 使用已有连接构造存储并运行迁移
    pub async fn from_connection(db: DatabaseConnection) -> Result<Self> {
        Migrator::up(&db, None)
            .await
            .map_err(|e| DoubleMarkingError::database_operation(format!("数据库迁移失败: {e}")))?;
        Ok(Self { db })
    }

    /// SQLite 专用连接（WAL + pragma 优化）
    async fn connect_sqlite(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
        };
        use std::str::FromStr;

        let opt = SqliteConnectOptions::from_str(url)
            .map_err(|e| DoubleMarkingError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .pragma("cache_size", "-64000")
            .pragma("temp_store", "memory")
            .pragma("mmap_size", "536870912")
            .pragma("wal_autocheckpoint", "1000");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.database.pool_size)
            .min_connections(1)
            .test_before_acquire(true)
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(300))
            .connect_with(opt)
            .await
            .map_err(|e| DoubleMarkingError::database_connection(format!("SQLite 连接失败: {e}")))?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    /// 通用连接（PostgreSQL、MySQL 等）
    async fn connect_generic(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(config.database.pool_size)
            .min_connections(5)
            .connect_timeout(Duration::from_secs(config.database.timeout))
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .sqlx_logging(false)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        Database::connect(opt)
            .await
            .map_err(|e| DoubleMarkingError::database_connection(format!("无法连接到数据库: {e}")))
    }

    /// 从 URL 自动推断数据库类型并构建连接 URL
    fn build_database_url(url: &str) -> Result<String> {
        if url.starts_with("sqlite://") {
            Ok(url.to_string())
        } else if url.ends_with(".db") || url.ends_with(".sqlite") || url == ":memory:" {
            Ok(format!("sqlite://{}?mode=rwc", url))
        } else if url.starts_with("postgres://")
            || url.starts_with("postgresql://")
            || url.starts_with("mysql://")
            || url.starts_with("mariadb://")
        {
            Ok(url.to_string())
        } else {
            Err(DoubleMarkingError::database_config(format!(
                "无法从 URL 推断数据库类型: {url}. 支持: sqlite://, postgres://, mysql://, 或 .db/.sqlite 文件路径"
            )))
        }
    }
}

// Storage trait 实现
use crate::models::{
    PaginationInfo,
    allocations::{
        entities::{Allocation, BlindSetting},
        requests::AllocationListQuery,
        responses::RatificationResult,
    },
    assignments::entities::Assignment,
    class_users::entities::ClassUser,
    grades::entities::GradebookEntry,
    privacy::responses::PrivacyDeleteResponse,
    users::entities::User,
};
use crate::storage::{MarkerGradeWrite, Storage};
use async_trait::async_trait;

#[async_trait]
impl Storage for SeaOrmStorage {
    // 用户模块
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.get_user_by_id_impl(id).await
    }

    // 班级成员模块
    async fn get_class_user_by_user_id_and_class_id(
        &self,
        user_id: i64,
        class_id: i64,
    ) -> Result<Option<ClassUser>> {
        self.get_class_user_by_user_id_and_class_id_impl(user_id, class_id)
            .await
    }

    // 作业模块
    async fn get_assignment_by_id(&self, assignment_id: i64) -> Result<Option<Assignment>> {
        self.get_assignment_by_id_impl(assignment_id).await
    }

    // 分配模块
    async fn get_allocation(
        &self,
        assignment_id: i64,
        subject_id: i64,
    ) -> Result<Option<Allocation>> {
        self.get_allocation_impl(assignment_id, subject_id).await
    }

    async fn get_assignment_settings(&self, assignment_id: i64) -> Result<Option<Allocation>> {
        self.get_assignment_settings_impl(assignment_id).await
    }

    async fn upsert_assignment_settings(
        &self,
        assignment_id: i64,
        blind_setting: BlindSetting,
        marks_hidden: bool,
    ) -> Result<Allocation> {
        self.upsert_assignment_settings_impl(assignment_id, blind_setting, marks_hidden)
            .await
    }

    async fn list_allocations(
        &self,
        assignment_id: i64,
        query: AllocationListQuery,
    ) -> Result<(Vec<Allocation>, PaginationInfo)> {
        self.list_allocations_impl(assignment_id, query).await
    }

    async fn upsert_allocation(
        &self,
        assignment_id: i64,
        subject_id: i64,
        marker1_id: i64,
        marker2_id: i64,
    ) -> Result<Allocation> {
        self.upsert_allocation_impl(assignment_id, subject_id, marker1_id, marker2_id)
            .await
    }

    async fn record_marker_grade(&self, write: MarkerGradeWrite) -> Result<Allocation> {
        self.record_marker_grade_impl(write).await
    }

    async fn save_ratification(
        &self,
        result: &RatificationResult,
        expected_version: i64,
    ) -> Result<Allocation> {
        self.save_ratification_impl(result, expected_version).await
    }

    // 成绩簿模块
    async fn upsert_gradebook_grade(
        &self,
        assignment_id: i64,
        student_id: i64,
        grader_id: i64,
        score: f64,
        comment: Option<String>,
    ) -> Result<GradebookEntry> {
        self.upsert_gradebook_grade_impl(assignment_id, student_id, grader_id, score, comment)
            .await
    }

    // 隐私模块
    async fn export_user_allocations(&self, user_id: i64) -> Result<Vec<Allocation>> {
        self.export_user_allocations_impl(user_id).await
    }

    async fn delete_user_marking_data(&self, user_id: i64) -> Result<PrivacyDeleteResponse> {
        self.delete_user_marking_data_impl(user_id).await
    }

    async fn delete_assignment_allocations(&self, assignment_id: i64) -> Result<u64> {
        self.delete_assignment_allocations_impl(assignment_id).await
    }
}
