use std::collections::hash_map::RandomState;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::result::Result as DefaultResult;

use serde::de::Error as DeserializeError;
use serde::Deserialize;

use crate::constant::{self as AppConst, hard_limit, logging as const_log};
use crate::error::{AppError, AppErrorCode};
use crate::AppLogAlias;

#[derive(Deserialize)]
pub struct AppLogHandlerCfg {
    pub min_level: const_log::Level,
    pub destination: const_log::Destination,
    pub alias: AppLogAlias,
    pub path: Option<String>,
}

#[derive(Deserialize)]
pub struct AppLoggerCfg {
    pub alias: AppLogAlias,
    pub handlers: Vec<String>,
    pub level: Option<const_log::Level>,
}

#[derive(Deserialize)]
pub struct AppLoggingCfg {
    pub handlers: Vec<AppLogHandlerCfg>,
    pub loggers: Vec<AppLoggerCfg>,
}

#[allow(non_camel_case_types)]
#[derive(Deserialize, Debug, Clone)]
pub enum AppDbServerType {
    MariaDB,
    PostgreSQL,
}

#[derive(Deserialize, Debug)]
pub struct AppInMemoryDbCfg {
    #[serde(deserialize_with = "jsn_deny_empty_string")]
    pub alias: String,
    pub max_items: u32,
}

#[derive(Deserialize, Debug)]
pub struct AppDbServerCfg {
    #[serde(deserialize_with = "jsn_deny_empty_string")]
    pub alias: String,
    pub srv_type: AppDbServerType,
    pub max_conns: u32,
    pub acquire_timeout_secs: u16, // for acquiring connection from pool
    pub idle_timeout_secs: u16,
    pub confidentiality_path: String,
    pub db_name: String,
}

#[allow(non_camel_case_types)]
#[derive(Deserialize)]
#[serde(tag = "_type")]
pub enum AppDataStoreCfg {
    InMemory(AppInMemoryDbCfg),
    DbServer(AppDbServerCfg),
}

#[derive(Deserialize, Debug)]
pub struct AppCacheCfg {
    pub entry_ttl_secs: u32,
    // short-lived, absorbs repeated lookups of nonexistent keys
    pub null_entry_ttl_secs: u32,
    pub rebuild_lock_ttl_secs: u32,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AppQueueOverflowPolicy {
    Block,
    Reject,
}

#[derive(Deserialize, Debug)]
pub struct AppSeckillCfg {
    pub queue_capacity: usize,
    pub queue_overflow: AppQueueOverflowPolicy,
    pub user_lock_ttl_secs: u32,
}

#[derive(Deserialize)]
#[serde(tag = "source")]
pub enum AppConfidentialCfg {
    UserSpace { sys_path: String },
}

#[derive(Deserialize)]
pub struct AppServiceCfg {
    pub logging: AppLoggingCfg,
    pub num_workers: u8,
    pub stack_sz_kb: u16,
    pub data_store: Vec<AppDataStoreCfg>,
    pub shared_store: AppInMemoryDbCfg,
    pub cache: AppCacheCfg,
    pub seckill: AppSeckillCfg,
    pub confidentiality: AppConfidentialCfg,
}

pub struct AppBasepathCfg {
    pub system: String,
    pub service: String,
}

pub struct AppConfig {
    pub basepath: AppBasepathCfg,
    pub service: AppServiceCfg,
}

pub struct AppCfgHardLimit {
    pub nitems_per_inmem_table: u32,
    pub num_db_conns: u32,
    pub seconds_db_idle: u16,
}

pub struct AppCfgInitArgs {
    pub env_var_map: HashMap<String, String, RandomState>,
    pub limit: AppCfgHardLimit,
}

impl AppConfig {
    pub fn new(args: AppCfgInitArgs) -> DefaultResult<Self, AppError> {
        let (mut env_var_map, limit) = (args.env_var_map, args.limit);
        let sys_basepath = if let Some(s) = env_var_map.remove(AppConst::ENV_VAR_SYS_BASE_PATH) {
            s + "/"
        } else {
            return Err(AppError {
                detail: None,
                code: AppErrorCode::MissingSysBasePath,
            });
        };
        let app_basepath =
            if let Some(a) = env_var_map.remove(AppConst::ENV_VAR_SERVICE_BASE_PATH) {
                a + "/"
            } else {
                return Err(AppError {
                    detail: None,
                    code: AppErrorCode::MissingAppBasePath,
                });
            };
        let service_cfg =
            if let Some(cfg_path) = env_var_map.remove(AppConst::ENV_VAR_CONFIG_FILE_PATH) {
                let fullpath = app_basepath.clone() + &cfg_path;
                Self::parse_from_file(fullpath, limit)?
            } else {
                return Err(AppError {
                    detail: None,
                    code: AppErrorCode::MissingConfigPath,
                });
            };
        Ok(Self {
            service: service_cfg,
            basepath: AppBasepathCfg {
                system: sys_basepath,
                service: app_basepath,
            },
        })
    } // end of fn new

    pub fn parse_from_file(
        filepath: String,
        limit: AppCfgHardLimit,
    ) -> DefaultResult<AppServiceCfg, AppError> {
        // load and parse a config file with given path
        match File::open(filepath) {
            Ok(fileobj) => {
                let reader = BufReader::new(fileobj);
                match serde_json::from_reader::<BufReader<File>, AppServiceCfg>(reader) {
                    Ok(jsnobj) => {
                        Self::_check_logging(&jsnobj.logging)?;
                        Self::_check_datastore(&jsnobj, &limit)?;
                        Self::_check_seckill(&jsnobj.seckill)?;
                        Ok(jsnobj)
                    }
                    Err(e) => Err(AppError {
                        code: AppErrorCode::InvalidJsonFormat,
                        detail: Some(e.to_string()),
                    }),
                }
            }
            Err(e) => Err(AppError {
                code: AppErrorCode::IOerror(e.kind()),
                detail: Some(e.to_string()),
            }),
        }
    } // end of fn parse_from_file

    fn _check_logging(cfg: &AppLoggingCfg) -> DefaultResult<(), AppError> {
        if cfg.handlers.is_empty() {
            return Err(AppError {
                code: AppErrorCode::NoLogHandlerCfg,
                detail: None,
            });
        }
        if cfg.loggers.is_empty() {
            return Err(AppError {
                code: AppErrorCode::NoLoggerCfg,
                detail: None,
            });
        }
        let mut hdlr_aliases: HashSet<&str, RandomState> = HashSet::new();
        for item in cfg.handlers.iter() {
            if !hdlr_aliases.insert(item.alias.as_str()) {
                return Err(AppError {
                    code: AppErrorCode::MissingAliasLogHdlerCfg,
                    detail: Some(format!("duplicate:{}", item.alias)),
                });
            }
            if matches!(item.destination, const_log::Destination::LOCALFS) && item.path.is_none() {
                return Err(AppError {
                    code: AppErrorCode::InvalidInput,
                    detail: Some(format!("localfs-handler-no-path:{}", item.alias)),
                });
            }
        }
        for logger in cfg.loggers.iter() {
            if logger.handlers.is_empty() {
                return Err(AppError {
                    code: AppErrorCode::NoHandlerInLoggerCfg,
                    detail: Some(logger.alias.as_str().to_string()),
                });
            }
            let unknown = logger
                .handlers
                .iter()
                .find(|a| !hdlr_aliases.contains(a.as_str()));
            if let Some(a) = unknown {
                return Err(AppError {
                    code: AppErrorCode::MissingAliasLoggerCfg,
                    detail: Some(format!("logger:{}, handler:{}", logger.alias, a)),
                });
            }
        }
        Ok(())
    } // end of fn _check_logging

    fn _check_datastore(
        cfg: &AppServiceCfg,
        limit: &AppCfgHardLimit,
    ) -> DefaultResult<(), AppError> {
        if cfg.shared_store.max_items > limit.nitems_per_inmem_table {
            return Err(AppError {
                code: AppErrorCode::ExceedingMaxLimit,
                detail: Some(format!("shared-store:{}", cfg.shared_store.alias)),
            });
        }
        for item in cfg.data_store.iter() {
            match item {
                AppDataStoreCfg::InMemory(c) => {
                    if c.max_items > limit.nitems_per_inmem_table {
                        return Err(AppError {
                            code: AppErrorCode::ExceedingMaxLimit,
                            detail: Some(format!("data-store:{}", c.alias)),
                        });
                    }
                }
                AppDataStoreCfg::DbServer(c) => {
                    if c.max_conns > limit.num_db_conns || c.idle_timeout_secs > limit.seconds_db_idle
                    {
                        return Err(AppError {
                            code: AppErrorCode::ExceedingMaxLimit,
                            detail: Some(format!("data-store:{}", c.alias)),
                        });
                    }
                }
            }
        }
        Ok(())
    } // end of fn _check_datastore

    fn _check_seckill(cfg: &AppSeckillCfg) -> DefaultResult<(), AppError> {
        let valid = (1..=hard_limit::MAX_ORDER_TASKS_PENDING).contains(&cfg.queue_capacity)
            && cfg.user_lock_ttl_secs > 0;
        if valid {
            Ok(())
        } else {
            Err(AppError {
                code: AppErrorCode::ExceedingMaxLimit,
                detail: Some("seckill".to_string()),
            })
        }
    }
} // end of impl AppConfig

fn jsn_deny_empty_string<'de, D>(raw: D) -> DefaultResult<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let val = String::deserialize(raw)?;
    if val.is_empty() {
        let unexp = serde::de::Unexpected::Str("");
        Err(DeserializeError::invalid_value(unexp, &"non-empty string"))
    } else {
        Ok(val)
    }
}
