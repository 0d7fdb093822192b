use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::env;

use tokio::runtime::Builder as RuntimeBuilder;

use voucher::confidentiality::{self, AbstractConfidentiality};
use voucher::constant::{hard_limit, EXPECTED_ENV_VAR_LABELS};
use voucher::logging::{app_log_event, AppLogContext, AppLogLevel};
use voucher::usecase::{AppOrderTaskQueue, OrderPersistWorker};
use voucher::{AppCfgHardLimit, AppCfgInitArgs, AppConfig, AppSharedState};

async fn start_persist_worker(shr_state: AppSharedState) {
    let logctx_p = shr_state.log_context().clone();
    let cfg = shr_state.config().clone();
    // the queue pair is created here once, the sender side is handed to
    // whatever ingress surface feeds admission requests into this process
    let (_task_sender, task_receiver) = AppOrderTaskQueue::build(&cfg.service.seckill);
    let worker = match OrderPersistWorker::build(shr_state.clone()).await {
        Ok(w) => w,
        Err(e) => {
            app_log_event!(logctx_p, AppLogLevel::ERROR, "worker-build, {}", e);
            return;
        }
    };
    let consumer_handle = tokio::spawn(worker.run(task_receiver));
    if let Err(e) = tokio::signal::ctrl_c().await {
        app_log_event!(logctx_p, AppLogLevel::ERROR, "signal, {}", e);
    }
    // closing the producer side lets the worker drain remaining tasks
    // then leave its loop
    drop(_task_sender);
    if let Err(e) = consumer_handle.await {
        app_log_event!(logctx_p, AppLogLevel::ERROR, "consumer-exit, {}", e);
    }
} // end of fn start_persist_worker

fn start_async_runtime(cfg: AppConfig, cfdntl: Box<dyn AbstractConfidentiality>) {
    let log_ctx = AppLogContext::new(&cfg.basepath, &cfg.service.logging);
    let shr_state = AppSharedState::new(cfg, log_ctx, cfdntl);
    let cfg = shr_state.config();
    let stack_nbytes: usize = (cfg.service.stack_sz_kb as usize) << 10;
    let result = RuntimeBuilder::new_multi_thread()
        .worker_threads(cfg.service.num_workers as usize)
        .thread_stack_size(stack_nbytes)
        .thread_name("order-persist-worker")
        // manage low-level I/O drivers used by network types
        .enable_io()
        .enable_time()
        .build();
    match result {
        Ok(rt) => {
            // new worker threads spawned
            rt.block_on(async move {
                start_persist_worker(shr_state).await;
            });
        }
        Err(e) => {
            let log_ctx_p = shr_state.log_context();
            app_log_event!(
                log_ctx_p,
                AppLogLevel::ERROR,
                "async runtime failed to build, {} ",
                e
            );
        }
    };
} // end of fn start_async_runtime

fn main() {
    let iter = env::vars().filter(|(k, _v)| EXPECTED_ENV_VAR_LABELS.contains(&k.as_str()));
    let env_var_map: HashMap<String, String, RandomState> = HashMap::from_iter(iter);
    let limit = AppCfgHardLimit {
        nitems_per_inmem_table: hard_limit::MAX_ITEMS_STORED_PER_MODEL,
        num_db_conns: hard_limit::MAX_DB_CONNECTIONS,
        seconds_db_idle: hard_limit::MAX_SECONDS_DB_IDLE,
    };
    match AppConfig::new(AppCfgInitArgs { env_var_map, limit }) {
        Ok(cfg) => match confidentiality::build_context(&cfg) {
            Ok(cfdntl) => {
                start_async_runtime(cfg, cfdntl);
            }
            Err(e) => {
                println!("app failed to init confidentiality handler, error: {} ", e);
            }
        },
        Err(e) => {
            println!("app failed to configure, error: {} ", e);
        }
    };
} // end of main
