// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Group import pipeline.
//!
//! Recreate an alternatives group from one root inside another. The group's
//! report is requested from each source root in order, and the first root
//! that produces a usable report wins. Every link of that report is then
//! relocated into the target overlay through [`SearchPaths`], and replayed as
//! a sequence of install operations followed by an optional activation.
//!
//! # Atomicity
//!
//! None. Operations are applied one at a time, and the first failure stops
//! the import. Whatever was applied before that stays in place.

use crate::{
    alternatives::Alternatives,
    group::{relocate::SearchPaths, report::GroupReport},
    overlay::OverlayRoot,
};

use std::{
    ffi::OsString,
    fmt::{Display, Formatter, Result as FmtResult},
    path::PathBuf,
};
use tracing::{debug, info, instrument, warn};

/// Secondary link installed alongside a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Child {
    pub link: PathBuf,
    pub name: String,
    pub value: String,
}

/// Install one candidate of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOperation {
    pub link: PathBuf,
    pub name: String,
    pub value: String,
    pub priority: u32,
    pub children: Vec<Child>,
}

impl InstallOperation {
    /// Command line arguments of the install verb.
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--install".into(),
            self.link.clone().into_os_string(),
            self.name.as_str().into(),
            self.value.as_str().into(),
            self.priority.to_string().into(),
        ];

        for child in &self.children {
            args.push("--slave".into());
            args.push(child.link.clone().into_os_string());
            args.push(child.name.as_str().into());
            args.push(child.value.as_str().into());
        }

        args
    }
}

/// Pin group to a specific candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivateOperation {
    pub name: String,
    pub value: String,
}

/// Step needed to recreate a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Install(InstallOperation),
    Activate(ActivateOperation),
}

impl Display for Operation {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Install(install) => {
                write!(
                    fmt,
                    "install {} {} {} {}",
                    install.link.display(),
                    install.name,
                    install.value,
                    install.priority
                )?;
                for child in &install.children {
                    write!(
                        fmt,
                        " [{} {} {}]",
                        child.link.display(),
                        child.name,
                        child.value
                    )?;
                }
                Ok(())
            }
            Self::Activate(activate) => write!(fmt, "set {} {}", activate.name, activate.value),
        }
    }
}

/// Everything needed to recreate one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPlan {
    /// Root that supplied the report.
    pub source: OverlayRoot,

    /// Report the operations were derived from.
    pub report: GroupReport,

    /// Operations in the order they must be applied.
    pub operations: Vec<Operation>,
}

/// Group importer.
///
/// Talks to the alternatives executable through `A`, and relocates links
/// through the search paths it was given.
#[derive(Debug)]
pub struct Importer<'a, A>
where
    A: Alternatives,
{
    alternatives: &'a A,
    search: SearchPaths,
}

impl<'a, A> Importer<'a, A>
where
    A: Alternatives,
{
    /// Construct new importer.
    pub fn new(alternatives: &'a A, search: SearchPaths) -> Self {
        Self {
            alternatives,
            search,
        }
    }

    /// Recreate group inside target root.
    ///
    /// Plans the import, then applies it.
    ///
    /// # Errors
    ///
    /// - Return [`ImportError::NotFound`] if no source root knows the group.
    /// - Return [`ImportError::UnresolvablePath`] if primary link cannot be
    ///   relocated.
    /// - Return [`ImportError::Overlay`] if target cannot be prepared.
    /// - Return [`ImportError::Operation`] if any operation fails.
    #[instrument(skip(self, target, sources), level = "debug")]
    pub fn import(
        &self,
        name: &str,
        target: &OverlayRoot,
        sources: &[OverlayRoot],
    ) -> Result<ImportPlan> {
        let plan = self.plan(name, target, sources)?;
        info!("import {:?} from {}", plan.report.name(), plan.source);
        self.apply(target, &plan)?;

        Ok(plan)
    }

    /// Determine operations needed to recreate group inside target root.
    ///
    /// Does not change anything. Each source root is queried in order until
    /// one produces a report that parses.
    ///
    /// # Errors
    ///
    /// - Return [`ImportError::NotFound`] if no source root knows the group.
    /// - Return [`ImportError::UnresolvablePath`] if primary link cannot be
    ///   relocated.
    #[instrument(skip(self, target, sources), level = "debug")]
    pub fn plan(
        &self,
        name: &str,
        target: &OverlayRoot,
        sources: &[OverlayRoot],
    ) -> Result<ImportPlan> {
        let (source, report) = self.find(name, sources)?;
        let operations = self.operations(&report, target)?;

        Ok(ImportPlan {
            source: source.clone(),
            report,
            operations,
        })
    }

    /// Apply planned operations to target root in order.
    ///
    /// Stops at the first failure without undoing earlier operations.
    ///
    /// # Errors
    ///
    /// - Return [`ImportError::Overlay`] if target cannot be prepared.
    /// - Return [`ImportError::Operation`] if any operation fails.
    pub fn apply(&self, target: &OverlayRoot, plan: &ImportPlan) -> Result<()> {
        target.ensure()?;

        for operation in &plan.operations {
            info!("{operation}");
            let result = match operation {
                Operation::Install(install) => self.alternatives.install(target, install),
                Operation::Activate(activate) => {
                    self.alternatives
                        .set(target, &activate.name, &activate.value)
                }
            };

            result.map_err(|err| ImportError::Operation {
                source: err,
                name: plan.report.name().into(),
                operation: operation.to_string(),
            })?;
        }

        Ok(())
    }

    fn find<'s>(
        &self,
        name: &str,
        sources: &'s [OverlayRoot],
    ) -> Result<(&'s OverlayRoot, GroupReport)> {
        for source in sources {
            // INVARIANT: Raw report text is owned by this iteration only.
            let text = match self.alternatives.query(source, name) {
                Ok(text) => text,
                Err(error) => {
                    debug!("no report for {name:?} in {source}: {error}");
                    continue;
                }
            };

            if text.trim().is_empty() {
                debug!("empty report for {name:?} in {source}");
                continue;
            }

            match text.parse::<GroupReport>() {
                Ok(report) => {
                    debug!("found {name:?} in {source}");
                    return Ok((source, report));
                }
                Err(error) => warn!("cannot parse report for {name:?} in {source}: {error}"),
            }
        }

        Err(ImportError::NotFound { name: name.into() })
    }

    fn operations(&self, report: &GroupReport, target: &OverlayRoot) -> Result<Vec<Operation>> {
        let name = report.name();
        let link = self
            .search
            .relativize(report.primary_link())
            .map(|relative| target.link_path(relative))
            .map_err(|err| ImportError::UnresolvablePath {
                source: err,
                name: name.into(),
            })?;

        let slave_links = report
            .slaves()
            .map(|(slave, path)| match self.search.relativize(path) {
                Ok(relative) => Some(target.link_path(relative)),
                Err(error) => {
                    warn!("skip slave {slave:?} of {name:?}: {error}");
                    None
                }
            })
            .collect::<Vec<_>>();

        let mut operations = Vec::with_capacity(report.candidates().len() + 1);
        for candidate in report.candidates() {
            let mut children = Vec::new();
            for (index, slave) in report.slave_names().iter().enumerate() {
                let Some(child_link) = &slave_links[index] else {
                    continue;
                };

                match candidate.secondary_value(index) {
                    Some(value) => children.push(Child {
                        link: child_link.clone(),
                        name: slave.clone(),
                        value: value.into(),
                    }),
                    None => warn!(
                        "skip slave {slave:?} of {name:?}: no value for {:?}",
                        candidate.value()
                    ),
                }
            }

            operations.push(Operation::Install(InstallOperation {
                link: link.clone(),
                name: name.into(),
                value: candidate.value().into(),
                priority: candidate.priority(),
                children,
            }));
        }

        if report.is_manual() && report.current_value() != "none" {
            operations.push(Operation::Activate(ActivateOperation {
                name: name.into(),
                value: report.current_value().into(),
            }));
        }

        Ok(operations)
    }
}

/// Import error types.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// No source root produced a report for group.
    #[error("alternatives group {name:?} not found in any source root")]
    NotFound { name: String },

    /// Primary link is neither an executable nor a manual page location.
    #[error("cannot relocate primary link of group {name:?}")]
    UnresolvablePath {
        #[source]
        source: crate::group::relocate::Unclassifiable,
        name: String,
    },

    /// Target overlay cannot be prepared.
    #[error(transparent)]
    Overlay(#[from] crate::overlay::Error),

    /// Alternatives executable rejected an operation.
    #[error("failed to {operation} for group {name:?}")]
    Operation {
        #[source]
        source: crate::alternatives::Error,
        name: String,
        operation: String,
    },
}

/// Friendly result alias :3
pub type Result<T, E = ImportError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alternatives::Error as AltError;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::{cell::RefCell, collections::HashMap};

    /// Records every call instead of running anything.
    #[derive(Debug, Default)]
    struct FakeAlternatives {
        reports: HashMap<PathBuf, String>,
        fail_on: Option<String>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeAlternatives {
        fn with_report(mut self, root: &OverlayRoot, report: &str) -> Self {
            self.reports.insert(root.altdir().to_path_buf(), report.into());
            self
        }
    }

    impl Alternatives for FakeAlternatives {
        fn call_non_interactive(
            &self,
            _root: &OverlayRoot,
            _args: impl IntoIterator<Item = impl Into<OsString>>,
        ) -> crate::alternatives::Result<String> {
            unreachable!("importer only uses query, install, and set")
        }

        fn call_interactive(
            &self,
            _root: &OverlayRoot,
            _args: impl IntoIterator<Item = impl Into<OsString>>,
        ) -> crate::alternatives::Result<()> {
            unreachable!("importer only uses query, install, and set")
        }

        fn query(&self, root: &OverlayRoot, name: &str) -> crate::alternatives::Result<String> {
            self.calls
                .borrow_mut()
                .push(format!("query {} {name}", root.altdir().display()));
            self.reports
                .get(root.altdir())
                .cloned()
                .ok_or_else(|| AltError::Failed {
                    program: "fake".into(),
                    message: format!("no alternatives for {name}"),
                })
        }

        fn install(
            &self,
            _root: &OverlayRoot,
            operation: &InstallOperation,
        ) -> crate::alternatives::Result<()> {
            let call = Operation::Install(operation.clone()).to_string();
            self.calls.borrow_mut().push(call.clone());
            if self.fail_on.as_deref() == Some(operation.value.as_str()) {
                return Err(AltError::Failed {
                    program: "fake".into(),
                    message: call,
                });
            }
            Ok(())
        }

        fn set(
            &self,
            _root: &OverlayRoot,
            name: &str,
            value: &str,
        ) -> crate::alternatives::Result<()> {
            self.calls.borrow_mut().push(format!("set {name} {value}"));
            Ok(())
        }
    }

    fn system() -> OverlayRoot {
        OverlayRoot::system("/etc/alternatives", "/var/lib/dpkg/alternatives")
    }

    fn search() -> SearchPaths {
        SearchPaths::new(["/usr/bin", "/bin"], ["/usr/share/man"])
    }

    const PAGER: &str = indoc! {r#"
        Name: pager
        Link: /usr/bin/pager
        Status: manual
        Best: /usr/bin/less
        Value: /usr/bin/less

        Alternative: /usr/bin/less
        Priority: 50
    "#};

    #[test]
    fn import_single_manual_candidate() -> anyhow::Result<()> {
        let fake = FakeAlternatives::default().with_report(&system(), PAGER);
        let target = OverlayRoot::user("/home/u/.config/my");
        let importer = Importer::new(&fake, search());

        let plan = importer.plan("pager", &target, &[system()])?;
        let expect = vec![
            Operation::Install(InstallOperation {
                link: PathBuf::from("/home/u/.config/my/bin/pager"),
                name: "pager".into(),
                value: "/usr/bin/less".into(),
                priority: 50,
                children: Vec::new(),
            }),
            Operation::Activate(ActivateOperation {
                name: "pager".into(),
                value: "/usr/bin/less".into(),
            }),
        ];

        assert_eq!(plan.operations, expect);
        assert_eq!(plan.source, system());

        Ok(())
    }

    #[test]
    fn auto_status_emits_no_activation() -> anyhow::Result<()> {
        let report = PAGER.replace("Status: manual", "Status: auto");
        let fake = FakeAlternatives::default().with_report(&system(), &report);
        let importer = Importer::new(&fake, search());

        let plan = importer.plan("pager", &OverlayRoot::user("/o"), &[system()])?;
        assert_eq!(plan.operations.len(), 1);
        assert!(matches!(plan.operations[0], Operation::Install(_)));

        Ok(())
    }

    #[test]
    fn manual_status_without_current_value_emits_no_activation() -> anyhow::Result<()> {
        let report = PAGER.replace("Value: /usr/bin/less", "Value: none");
        let fake = FakeAlternatives::default().with_report(&system(), &report);
        let importer = Importer::new(&fake, search());

        let plan = importer.plan("pager", &OverlayRoot::user("/o"), &[system()])?;
        assert_eq!(plan.operations.len(), 1);

        Ok(())
    }

    #[test]
    fn candidates_keep_report_order_and_skip_unusable_slaves() -> anyhow::Result<()> {
        let report = indoc! {r#"
            Name: pager
            Link: /usr/bin/pager
            Slaves:
             pager.1.gz /usr/share/man/man1/pager.1.gz
             pager.conf /etc/pager.conf
            Status: auto
            Best: /usr/bin/less
            Value: /usr/bin/less

            Alternative: /usr/bin/less
            Priority: 77
            Slaves:
             pager.1.gz /usr/share/man/man1/less.1.gz
             pager.conf /etc/less.conf

            Alternative: /bin/more
            Priority: 90
        "#};
        let fake = FakeAlternatives::default().with_report(&system(), report);
        let importer = Importer::new(&fake, search());

        let plan = importer.plan("pager", &OverlayRoot::user("/o"), &[system()])?;
        let expect = vec![
            Operation::Install(InstallOperation {
                link: PathBuf::from("/o/bin/pager"),
                name: "pager".into(),
                value: "/usr/bin/less".into(),
                priority: 77,
                children: vec![Child {
                    link: PathBuf::from("/o/man/man1/pager.1.gz"),
                    name: "pager.1.gz".into(),
                    value: "/usr/share/man/man1/less.1.gz".into(),
                }],
            }),
            Operation::Install(InstallOperation {
                link: PathBuf::from("/o/bin/pager"),
                name: "pager".into(),
                value: "/bin/more".into(),
                priority: 90,
                children: Vec::new(),
            }),
        ];
        assert_eq!(plan.operations, expect);

        Ok(())
    }

    #[test]
    fn falls_back_to_next_source_root() -> anyhow::Result<()> {
        let persistent = OverlayRoot::user("/home/u/.config/ualt");
        let fake = FakeAlternatives::default()
            .with_report(&persistent, "\n")
            .with_report(&system(), PAGER);
        let importer = Importer::new(&fake, search());

        let sources = [persistent.clone(), system()];
        let plan = importer.plan("pager", &OverlayRoot::user("/tmp/x"), &sources)?;
        assert_eq!(plan.source, system());
        assert_eq!(plan.report.name(), "pager");
        assert_eq!(
            *fake.calls.borrow(),
            vec![
                "query /home/u/.config/ualt/etc/alternatives pager".to_string(),
                "query /etc/alternatives pager".to_string(),
            ]
        );

        Ok(())
    }

    #[test]
    fn first_source_root_wins() -> anyhow::Result<()> {
        let persistent = OverlayRoot::user("/home/u/.config/ualt");
        let fake = FakeAlternatives::default()
            .with_report(&persistent, &PAGER.replace("Priority: 50", "Priority: 5"))
            .with_report(&system(), PAGER);
        let importer = Importer::new(&fake, search());

        let sources = [persistent.clone(), system()];
        let plan = importer.plan("pager", &OverlayRoot::user("/tmp/x"), &sources)?;
        assert_eq!(plan.source, persistent);
        assert_eq!(plan.report.candidates()[0].priority(), 5);
        assert_eq!(fake.calls.borrow().len(), 1);

        Ok(())
    }

    #[test]
    fn unknown_group_is_not_found() {
        let fake = FakeAlternatives::default().with_report(&system(), "Name: broken\n");
        let importer = Importer::new(&fake, search());

        let sources = [OverlayRoot::user("/p"), system()];
        let result = importer.plan("pager", &OverlayRoot::user("/o"), &sources);
        assert!(matches!(result, Err(ImportError::NotFound { name }) if name == "pager"));
    }

    #[test]
    fn unclassifiable_primary_link_is_fatal() {
        let report = PAGER.replace("Link: /usr/bin/pager", "Link: /opt/weird/pager");
        let fake = FakeAlternatives::default().with_report(&system(), &report);
        let importer = Importer::new(&fake, search());

        let result = importer.plan("pager", &OverlayRoot::user("/o"), &[system()]);
        assert!(matches!(result, Err(ImportError::UnresolvablePath { .. })));
    }

    #[test]
    fn apply_stops_at_first_failure() -> anyhow::Result<()> {
        let report = indoc! {r#"
            Name: pager
            Link: /usr/bin/pager
            Status: manual
            Best: /usr/bin/less
            Value: /usr/bin/less

            Alternative: /bin/more
            Priority: 10

            Alternative: /usr/bin/less
            Priority: 50

            Alternative: /usr/bin/most
            Priority: 20
        "#};
        let mut fake = FakeAlternatives::default().with_report(&system(), report);
        fake.fail_on = Some("/usr/bin/less".into());
        let dir = tempfile::tempdir()?;
        let target = OverlayRoot::user(dir.path());
        let importer = Importer::new(&fake, search());

        let result = importer.import("pager", &target, &[system()]);
        assert!(matches!(result, Err(ImportError::Operation { .. })));

        // Query, first install, failed install. Nothing after that.
        let calls = fake.calls.borrow();
        assert_eq!(calls.len(), 3);
        assert!(calls[1].contains("/bin/more"));
        assert!(calls[2].contains("/usr/bin/less"));

        Ok(())
    }

    #[test]
    fn import_applies_installs_then_activation() -> anyhow::Result<()> {
        let fake = FakeAlternatives::default().with_report(&system(), PAGER);
        let dir = tempfile::tempdir()?;
        let target = OverlayRoot::user(dir.path());
        let importer = Importer::new(&fake, search());

        importer.import("pager", &target, &[system()])?;
        let calls = fake.calls.borrow();
        assert_eq!(calls.len(), 3);
        assert!(calls[1].starts_with("install "));
        assert_eq!(calls[2], "set pager /usr/bin/less");
        assert!(target.bin_dir().is_dir());

        Ok(())
    }
}
