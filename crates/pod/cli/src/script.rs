//! Operation scripts
//!
//! A script is a JSON document listing steps to run against a fresh
//! in-memory pod system. Steps can bind names (`"as": "orca"`) and later
//! steps refer to them with `$orca`. Creating a pod also binds
//! `$<name>.wallet` to its wallet address.

use pod_runtime::{ControllerVersion, PodSystem};
use pod_types::{Address, AddressSlot, MultiCreateBatch, PodError, PodId, WalletCall};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Unknown binding: ${0}")]
    UnknownBinding(String),

    #[error("Not a pod reference: {0}")]
    BadPodReference(String),

    #[error("Step {step} ({op}) succeeded but was expected to fail with '{expected}'")]
    UnexpectedSuccess {
        step: usize,
        op: String,
        expected: String,
    },

    #[error("Step {step} ({op}) failed: {source}")]
    StepFailed {
        step: usize,
        op: String,
        #[source]
        source: PodError,
    },
}

pub type ScriptResult<T> = Result<T, ScriptError>;

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub action: Action,

    /// Substring the step's error message must contain
    #[serde(default)]
    pub expect_error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    DeployController {
        version: ControllerVersion,
        #[serde(rename = "as")]
        bind: String,
    },
    RegisterController {
        caller: String,
        controller: String,
    },
    RemoveController {
        caller: String,
        controller: String,
    },
    DeployWallet {
        owners: Vec<String>,
        threshold: u32,
        #[serde(rename = "as")]
        bind: String,
    },
    CreatePod {
        controller: String,
        caller: String,
        members: Vec<String>,
        threshold: u32,
        #[serde(default)]
        admin: Option<String>,
        #[serde(default)]
        label: Option<String>,
        #[serde(rename = "as")]
        bind: Option<String>,
    },
    CreatePodWithSafe {
        controller: String,
        caller: String,
        wallet: String,
        #[serde(default)]
        admin: Option<String>,
        #[serde(default)]
        label: Option<String>,
        #[serde(rename = "as")]
        bind: Option<String>,
    },
    MultiCreate {
        controller: String,
        caller: String,
        batch: MultiCreateBatch,
        /// Names for the created pods, in batch order
        #[serde(default, rename = "as")]
        binds: Vec<String>,
    },
    Mint {
        caller: String,
        to: String,
        pod: String,
    },
    Burn {
        caller: String,
        from: String,
        pod: String,
    },
    Transfer {
        caller: String,
        from: String,
        to: String,
        pod: String,
    },
    UpdatePodAdmin {
        controller: String,
        caller: String,
        pod: String,
        #[serde(default)]
        admin: Option<String>,
    },
    SetPodModuleLock {
        controller: String,
        caller: String,
        pod: String,
        locked: bool,
    },
    SetPodTransferLock {
        controller: String,
        caller: String,
        pod: String,
        locked: bool,
    },
    Migrate {
        controller: String,
        caller: String,
        pod: String,
        to: String,
        #[serde(default)]
        predecessor: Option<String>,
    },
    Eject {
        controller: String,
        caller: String,
        pod: String,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        previous_module: Option<String>,
        #[serde(default)]
        members: Option<Vec<String>>,
    },
    WalletTransaction {
        wallet: String,
        call: WalletCall,
    },
    SetUri {
        caller: String,
        uri: String,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DeployController { .. } => "deploy_controller",
            Self::RegisterController { .. } => "register_controller",
            Self::RemoveController { .. } => "remove_controller",
            Self::DeployWallet { .. } => "deploy_wallet",
            Self::CreatePod { .. } => "create_pod",
            Self::CreatePodWithSafe { .. } => "create_pod_with_safe",
            Self::MultiCreate { .. } => "multi_create",
            Self::Mint { .. } => "mint",
            Self::Burn { .. } => "burn",
            Self::Transfer { .. } => "transfer",
            Self::UpdatePodAdmin { .. } => "update_pod_admin",
            Self::SetPodModuleLock { .. } => "set_pod_module_lock",
            Self::SetPodTransferLock { .. } => "set_pod_transfer_lock",
            Self::Migrate { .. } => "migrate",
            Self::Eject { .. } => "eject",
            Self::WalletTransaction { .. } => "wallet_transaction",
            Self::SetUri { .. } => "set_uri",
        }
    }
}

/// What happened at one step
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: usize,
    pub op: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Names bound by earlier steps
#[derive(Debug, Default)]
pub struct Bindings {
    addresses: BTreeMap<String, Address>,
    pods: BTreeMap<String, PodId>,
}

impl Bindings {
    /// `$name` resolves to a bound address; anything else is taken literally
    pub fn address(&self, reference: &str) -> ScriptResult<Address> {
        match reference.strip_prefix('$') {
            Some(name) => self
                .addresses
                .get(name)
                .cloned()
                .ok_or_else(|| ScriptError::UnknownBinding(name.to_string())),
            None => Ok(Address::new(reference)),
        }
    }

    fn optional(&self, reference: Option<&String>) -> ScriptResult<Option<Address>> {
        reference.map(|r| self.address(r)).transpose()
    }

    fn addresses(&self, references: &[String]) -> ScriptResult<Vec<Address>> {
        references.iter().map(|r| self.address(r)).collect()
    }

    /// `$name` resolves to a bound pod; a bare number is a pod id
    pub fn pod(&self, reference: &str) -> ScriptResult<PodId> {
        match reference.strip_prefix('$') {
            Some(name) => self
                .pods
                .get(name)
                .copied()
                .ok_or_else(|| ScriptError::UnknownBinding(name.to_string())),
            None => reference
                .parse::<u64>()
                .map(PodId::new)
                .map_err(|_| ScriptError::BadPodReference(reference.to_string())),
        }
    }

    fn bind_address(&mut self, name: &str, address: Address) {
        debug!(name, address = %address, "Bound address");
        self.addresses.insert(name.to_string(), address);
    }

    fn bind_pod(&mut self, name: &str, pod_id: PodId, wallet: Address) {
        self.pods.insert(name.to_string(), pod_id);
        self.bind_address(&format!("{}.wallet", name), wallet);
    }

    fn slot(&self, slot: &AddressSlot) -> ScriptResult<AddressSlot> {
        Ok(match slot {
            AddressSlot::Literal(address) => AddressSlot::Literal(self.address(address.as_str())?),
            pointer => pointer.clone(),
        })
    }

    fn batch(&self, batch: &MultiCreateBatch) -> ScriptResult<MultiCreateBatch> {
        Ok(MultiCreateBatch {
            members: batch
                .members
                .iter()
                .map(|slots| slots.iter().map(|s| self.slot(s)).collect())
                .collect::<ScriptResult<_>>()?,
            thresholds: batch.thresholds.clone(),
            admins: batch
                .admins
                .iter()
                .map(|a| a.as_ref().map(|s| self.slot(s)).transpose())
                .collect::<ScriptResult<_>>()?,
            labels: batch.labels.clone(),
        })
    }

    fn call(&self, call: &WalletCall) -> ScriptResult<WalletCall> {
        let a = |address: &Address| self.address(address.as_str());
        Ok(match call {
            WalletCall::AddOwnerWithThreshold { owner, threshold } => WalletCall::AddOwnerWithThreshold {
                owner: a(owner)?,
                threshold: *threshold,
            },
            WalletCall::RemoveOwner {
                prev_owner,
                owner,
                threshold,
            } => WalletCall::RemoveOwner {
                prev_owner: a(prev_owner)?,
                owner: a(owner)?,
                threshold: *threshold,
            },
            WalletCall::SwapOwner {
                prev_owner,
                old_owner,
                new_owner,
            } => WalletCall::SwapOwner {
                prev_owner: a(prev_owner)?,
                old_owner: a(old_owner)?,
                new_owner: a(new_owner)?,
            },
            WalletCall::ChangeThreshold { threshold } => WalletCall::ChangeThreshold {
                threshold: *threshold,
            },
            WalletCall::EnableModule { module } => WalletCall::EnableModule { module: a(module)? },
            WalletCall::DisableModule {
                prev_module,
                module,
            } => WalletCall::DisableModule {
                prev_module: a(prev_module)?,
                module: a(module)?,
            },
            WalletCall::SetGuard { guard } => WalletCall::SetGuard {
                guard: guard.as_ref().map(a).transpose()?,
            },
        })
    }
}

/// Replays scripts against one pod system
pub struct Runner {
    system: PodSystem,
    bindings: Bindings,
}

impl Runner {
    pub fn new(system: PodSystem) -> Self {
        Self {
            system,
            bindings: Bindings::default(),
        }
    }

    pub fn system(&self) -> &PodSystem {
        &self.system
    }

    /// Run every step; stops at the first step that does not behave as expected
    pub fn run(&mut self, script: &Script) -> ScriptResult<Vec<StepOutcome>> {
        let mut outcomes = Vec::with_capacity(script.steps.len());
        for (index, step) in script.steps.iter().enumerate() {
            let op = step.action.name();
            let result = self.execute(&step.action);

            let outcome = match (result, &step.expect_error) {
                (Ok(detail), None) => StepOutcome {
                    step: index,
                    op: op.to_string(),
                    ok: true,
                    detail,
                },
                (Ok(_), Some(expected)) => {
                    return Err(ScriptError::UnexpectedSuccess {
                        step: index,
                        op: op.to_string(),
                        expected: expected.clone(),
                    })
                }
                (Err(ScriptError::StepFailed { source, .. }), Some(expected))
                    if source.to_string().contains(expected.as_str()) =>
                {
                    StepOutcome {
                        step: index,
                        op: op.to_string(),
                        ok: false,
                        detail: Some(source.to_string()),
                    }
                }
                (Err(ScriptError::StepFailed { source, .. }), _) => {
                    return Err(ScriptError::StepFailed {
                        step: index,
                        op: op.to_string(),
                        source,
                    })
                }
                (Err(other), _) => return Err(other),
            };
            outcomes.push(outcome);
        }

        info!(steps = outcomes.len(), "Script finished");
        Ok(outcomes)
    }

    fn execute(&mut self, action: &Action) -> ScriptResult<Option<String>> {
        let op = action.name();
        let failed = |source: PodError| ScriptError::StepFailed {
            step: 0,
            op: op.to_string(),
            source,
        };
        let b = &self.bindings;

        match action {
            Action::DeployController { version, bind } => {
                let address = self.system.deploy_controller(*version).map_err(failed)?;
                self.bindings.bind_address(bind, address.clone());
                Ok(Some(format!("{} controller at {}", version, address)))
            }
            Action::RegisterController { caller, controller } => {
                let (caller, controller) = (b.address(caller)?, b.address(controller)?);
                self.system
                    .register_controller(&caller, &controller)
                    .map_err(failed)?;
                Ok(None)
            }
            Action::RemoveController { caller, controller } => {
                let (caller, controller) = (b.address(caller)?, b.address(controller)?);
                self.system
                    .remove_controller(&caller, &controller)
                    .map_err(failed)?;
                Ok(None)
            }
            Action::DeployWallet {
                owners,
                threshold,
                bind,
            } => {
                let owners = b.addresses(owners)?;
                let wallet = self
                    .system
                    .deploy_wallet(&owners, *threshold)
                    .map_err(failed)?;
                self.bindings.bind_address(bind, wallet.clone());
                Ok(Some(format!("wallet {}", wallet)))
            }
            Action::CreatePod {
                controller,
                caller,
                members,
                threshold,
                admin,
                label,
                bind,
            } => {
                let controller = b.address(controller)?;
                let caller = b.address(caller)?;
                let members = b.addresses(members)?;
                let admin = b.optional(admin.as_ref())?;
                let pod_id = self
                    .system
                    .controller(&controller)
                    .and_then(|mut c| {
                        c.create_pod(&caller, &members, *threshold, admin, label.as_deref())
                    })
                    .map_err(failed)?;
                self.bind_created(bind.as_deref(), pod_id)
            }
            Action::CreatePodWithSafe {
                controller,
                caller,
                wallet,
                admin,
                label,
                bind,
            } => {
                let controller = b.address(controller)?;
                let caller = b.address(caller)?;
                let wallet = b.address(wallet)?;
                let admin = b.optional(admin.as_ref())?;
                let pod_id = self
                    .system
                    .controller(&controller)
                    .and_then(|mut c| {
                        c.create_pod_with_safe(&caller, admin, &wallet, label.as_deref())
                    })
                    .map_err(failed)?;
                self.bind_created(bind.as_deref(), pod_id)
            }
            Action::MultiCreate {
                controller,
                caller,
                batch,
                binds,
            } => {
                let controller = b.address(controller)?;
                let caller = b.address(caller)?;
                let batch = b.batch(batch)?;
                let pod_ids = self
                    .system
                    .controller(&controller)
                    .and_then(|mut c| c.multi_create(&caller, &batch))
                    .map_err(failed)?;
                for (name, pod_id) in binds.iter().zip(&pod_ids) {
                    self.bind_created(Some(name), *pod_id)?;
                }
                let ids: Vec<String> = pod_ids.iter().map(ToString::to_string).collect();
                Ok(Some(format!("created {}", ids.join(", "))))
            }
            Action::Mint { caller, to, pod } => {
                let (caller, to, pod) = (b.address(caller)?, b.address(to)?, b.pod(pod)?);
                self.system.mint(&caller, &to, pod).map_err(failed)?;
                Ok(None)
            }
            Action::Burn { caller, from, pod } => {
                let (caller, from, pod) = (b.address(caller)?, b.address(from)?, b.pod(pod)?);
                self.system.burn(&caller, &from, pod).map_err(failed)?;
                Ok(None)
            }
            Action::Transfer {
                caller,
                from,
                to,
                pod,
            } => {
                let (caller, from, to) = (b.address(caller)?, b.address(from)?, b.address(to)?);
                let pod = b.pod(pod)?;
                self.system
                    .transfer(&caller, &from, &to, pod)
                    .map_err(failed)?;
                Ok(None)
            }
            Action::UpdatePodAdmin {
                controller,
                caller,
                pod,
                admin,
            } => {
                let (controller, caller, pod) = (b.address(controller)?, b.address(caller)?, b.pod(pod)?);
                let admin = b.optional(admin.as_ref())?;
                self.system
                    .controller(&controller)
                    .and_then(|mut c| c.update_pod_admin(&caller, pod, admin))
                    .map_err(failed)?;
                Ok(None)
            }
            Action::SetPodModuleLock {
                controller,
                caller,
                pod,
                locked,
            } => {
                let (controller, caller, pod) = (b.address(controller)?, b.address(caller)?, b.pod(pod)?);
                self.system
                    .controller(&controller)
                    .and_then(|mut c| c.set_pod_module_lock(&caller, pod, *locked))
                    .map_err(failed)?;
                Ok(None)
            }
            Action::SetPodTransferLock {
                controller,
                caller,
                pod,
                locked,
            } => {
                let (controller, caller, pod) = (b.address(controller)?, b.address(caller)?, b.pod(pod)?);
                self.system
                    .controller(&controller)
                    .and_then(|mut c| c.set_pod_transfer_lock(&caller, pod, *locked))
                    .map_err(failed)?;
                Ok(None)
            }
            Action::Migrate {
                controller,
                caller,
                pod,
                to,
                predecessor,
            } => {
                let (controller, caller, pod) = (b.address(controller)?, b.address(caller)?, b.pod(pod)?);
                let to = b.address(to)?;
                let predecessor = b.optional(predecessor.as_ref())?;
                self.system
                    .controller(&controller)
                    .and_then(|mut c| c.migrate_pod_controller(&caller, pod, &to, predecessor))
                    .map_err(failed)?;
                Ok(Some(format!("{} now under {}", pod, to)))
            }
            Action::Eject {
                controller,
                caller,
                pod,
                label,
                previous_module,
                members,
            } => {
                let (controller, caller, pod) = (b.address(controller)?, b.address(caller)?, b.pod(pod)?);
                let previous_module = b.optional(previous_module.as_ref())?;
                let members = members.as_deref().map(|m| b.addresses(m)).transpose()?;
                self.system
                    .controller(&controller)
                    .and_then(|mut c| {
                        c.eject_safe(
                            &caller,
                            pod,
                            label.as_deref(),
                            previous_module,
                            members.as_deref(),
                        )
                    })
                    .map_err(failed)?;
                Ok(Some(format!("{} ejected", pod)))
            }
            Action::WalletTransaction { wallet, call } => {
                let wallet = b.address(wallet)?;
                let call = b.call(call)?;
                self.system
                    .exec_wallet_transaction(&wallet, &call)
                    .map_err(failed)?;
                Ok(Some(call.name().to_string()))
            }
            Action::SetUri { caller, uri } => {
                let caller = b.address(caller)?;
                self.system.set_uri(&caller, uri).map_err(failed)?;
                Ok(None)
            }
        }
    }

    fn bind_created(&mut self, bind: Option<&str>, pod_id: PodId) -> ScriptResult<Option<String>> {
        let wallet = self
            .system
            .pod(pod_id)
            .map(|r| r.wallet.clone())
            .ok_or(ScriptError::StepFailed {
                step: 0,
                op: "bind".to_string(),
                source: PodError::PodDoesNotExist(pod_id),
            })?;
        if let Some(name) = bind {
            self.bindings.bind_pod(name, pod_id, wallet.clone());
        }
        Ok(Some(format!("{} with wallet {}", pod_id, wallet)))
    }
}
