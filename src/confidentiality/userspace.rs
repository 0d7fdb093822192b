use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::result::Result as DefaultResult;
use std::sync::RwLock;

use serde_json::Value as JsnVal;

use super::AbstractConfidentiality;
use crate::error::{AppError, AppErrorCode};

const SOURCE_SIZE_LIMIT_NBYTES: u64 = 8196;

pub struct UserSpaceConfidentiality {
    _src_fullpath: String,
    // the inner cache should NOT be large for each application, so far the
    // only module interacting with this confidential handler is the SQL
    // database adapter
    _cached: RwLock<HashMap<String, String>>,
}

impl UserSpaceConfidentiality {
    pub fn build(fullpath: String) -> Self {
        let _cached = RwLock::new(HashMap::new());
        Self {
            _cached,
            _src_fullpath: fullpath,
        }
    }

    fn rawdata_from_source(&self) -> DefaultResult<Vec<u8>, AppError> {
        let srcpath = self._src_fullpath.as_str();
        let mut rawbuf = Vec::new(); // the source file should NOT be large
        match File::open(srcpath) {
            Ok(mut file) => {
                let actual_f_sz = match file.metadata() {
                    Ok(m) => m.len(),
                    Err(e) => {
                        return Err(AppError {
                            code: AppErrorCode::IOerror(e.kind()),
                            detail: Some(e.to_string()),
                        })
                    }
                };
                if actual_f_sz < SOURCE_SIZE_LIMIT_NBYTES {
                    match file.read_to_end(&mut rawbuf) {
                        Ok(_sz) => Ok(rawbuf),
                        Err(e) => Err(AppError {
                            detail: Some(e.to_string()),
                            code: AppErrorCode::IOerror(e.kind()),
                        }),
                    }
                } else {
                    Err(AppError {
                        code: AppErrorCode::ExceedingMaxLimit,
                        detail: Some("source-file".to_string()),
                    })
                }
            }
            Err(e) => Err(AppError {
                code: AppErrorCode::IOerror(e.kind()),
                detail: Some(e.to_string()),
            }),
        }
    } // end of fn rawdata_from_source

    fn to_json(&self, raw: Vec<u8>) -> DefaultResult<JsnVal, AppError> {
        match serde_json::from_slice::<JsnVal>(&raw) {
            Ok(obj) => Ok(obj),
            Err(e) => Err(AppError {
                code: AppErrorCode::InvalidJsonFormat,
                detail: Some(e.to_string()),
            }),
        }
    }

    fn search_json_payload<'a>(
        &self,
        toplvl: &'a JsnVal,
        id_: &str,
    ) -> DefaultResult<&'a JsnVal, AppError> {
        let mut curr_lvl = toplvl;
        for tok in id_.split('/') {
            curr_lvl = match curr_lvl {
                JsnVal::Object(o) => match o.get(tok) {
                    Some(v) => v,
                    None => {
                        return Err(AppError {
                            code: AppErrorCode::InvalidInput,
                            detail: Some(format!("path-not-exist:{id_}")),
                        })
                    }
                },
                _others => {
                    return Err(AppError {
                        code: AppErrorCode::InvalidInput,
                        detail: Some(format!("not-an-object:{id_}")),
                    })
                }
            };
        }
        Ok(curr_lvl)
    } // end of fn search_json_payload
} // end of impl UserSpaceConfidentiality

impl AbstractConfidentiality for UserSpaceConfidentiality {
    fn try_get_payload(&self, id_: &str) -> DefaultResult<String, AppError> {
        if let Ok(guard) = self._cached.read() {
            if let Some(serial) = guard.get(id_) {
                return Ok(serial.clone());
            }
        }
        let raw = self.rawdata_from_source()?;
        let toplvl = self.to_json(raw)?;
        let payload = self.search_json_payload(&toplvl, id_)?;
        let serial = payload.to_string();
        if let Ok(mut guard) = self._cached.write() {
            guard.insert(id_.to_string(), serial.clone());
        }
        Ok(serial)
    }
}
