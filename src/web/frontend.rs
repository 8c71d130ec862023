//! Embedded HTML/CSS/JS frontend for the taskboard web dashboard.
//!
//! The entire page is compiled into the binary as a string constant. It only
//! renders what the JSON API returns; every number is computed server-side.

/// The complete single-page dashboard HTML.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>taskboard</title>
<style>
:root {
  --bg: #0d1117;
  --surface: #161b22;
  --border: #30363d;
  --text: #e6edf3;
  --text-muted: #8b949e;
  --accent: #58a6ff;
  --green: #3fb950;
  --yellow: #d29922;
  --red: #f85149;
  --purple: #bc8cff;
  --cyan: #39d2c0;
  --radius: 8px;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
  --mono: 'SF Mono', 'Cascadia Code', 'Fira Code', monospace;
}

* { margin: 0; padding: 0; box-sizing: border-box; }
body {
  background: var(--bg);
  color: var(--text);
  font-family: var(--font);
  font-size: 14px;
  line-height: 1.5;
}

.app { max-width: 1200px; margin: 0 auto; padding: 24px; }

header {
  display: flex;
  align-items: center;
  justify-content: space-between;
  margin-bottom: 24px;
  padding-bottom: 16px;
  border-bottom: 1px solid var(--border);
  gap: 12px;
}

header h1 { font-size: 24px; font-weight: 600; }
header .subtitle { color: var(--text-muted); font-size: 13px; }
.controls { display: flex; gap: 8px; align-items: center; }

.badge {
  display: inline-flex;
  align-items: center;
  padding: 4px 10px;
  border-radius: 12px;
  font-size: 12px;
  font-weight: 500;
  background: var(--surface);
  border: 1px solid var(--border);
}
.badge.ok { border-color: var(--green); color: var(--green); }
.badge.warn { border-color: var(--yellow); color: var(--yellow); }
.badge.err { border-color: var(--red); color: var(--red); }

nav {
  display: flex;
  gap: 4px;
  margin-bottom: 24px;
  background: var(--surface);
  border-radius: var(--radius);
  padding: 4px;
  border: 1px solid var(--border);
}
nav button {
  flex: 1;
  padding: 8px 16px;
  border: none;
  border-radius: 6px;
  background: transparent;
  color: var(--text-muted);
  font-size: 13px;
  font-weight: 500;
  cursor: pointer;
}
nav button:hover { color: var(--text); background: rgba(255,255,255,0.04); }
nav button.active { background: var(--accent); color: #fff; }

.card {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 20px;
  margin-bottom: 16px;
}
.card h2 { font-size: 16px; font-weight: 600; margin-bottom: 16px; }
.grid-2 { display: grid; grid-template-columns: 1fr 1fr; gap: 16px; }

.stats-grid {
  display: grid;
  grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
  gap: 16px;
  margin-bottom: 24px;
}
.stat-card {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 20px;
  text-align: center;
}
.stat-card .value {
  font-size: 32px;
  font-weight: 700;
  font-family: var(--mono);
  color: var(--accent);
  line-height: 1.1;
}
.stat-card .label {
  font-size: 12px;
  color: var(--text-muted);
  margin-top: 6px;
  text-transform: uppercase;
  letter-spacing: 0.5px;
}

table { width: 100%; border-collapse: collapse; font-size: 13px; }
th, td { text-align: left; padding: 8px 12px; border-bottom: 1px solid var(--border); }
th {
  color: var(--text-muted);
  font-weight: 500;
  font-size: 12px;
  text-transform: uppercase;
  letter-spacing: 0.5px;
}
td.mono { font-family: var(--mono); font-size: 12px; }
td.num, th.num { text-align: right; font-family: var(--mono); }
tr.clickable { cursor: pointer; }
tr:hover { background: rgba(255,255,255,0.02); }

.bar-row { display: flex; align-items: center; gap: 8px; margin-bottom: 6px; font-size: 12px; }
.bar-row .name { flex: 0 0 180px; overflow: hidden; text-overflow: ellipsis; white-space: nowrap; }
.bar-row .track { flex: 1; background: var(--bg); border-radius: 3px; height: 14px; }
.bar-row .fill { background: var(--accent); height: 100%; border-radius: 3px; min-width: 2px; }
.bar-row .fill.green { background: var(--green); }
.bar-row .fill.red { background: var(--red); }
.bar-row .fill.yellow { background: var(--yellow); }
.bar-row .fill.purple { background: var(--purple); }
.bar-row .count { flex: 0 0 60px; text-align: right; font-family: var(--mono); }

select, .btn {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: 6px;
  color: var(--text);
  padding: 6px 10px;
  font-size: 13px;
}
.btn { cursor: pointer; }
.btn:hover { border-color: var(--accent); color: var(--accent); }

pre.logs {
  background: var(--bg);
  border: 1px solid var(--border);
  border-radius: 6px;
  padding: 12px;
  font-family: var(--mono);
  font-size: 12px;
  max-height: 400px;
  overflow: auto;
  white-space: pre-wrap;
}

.status-SUCCESS, .status-COMPLETED { color: var(--green); }
.status-FAILED, .status-FAILURE { color: var(--red); }
.status-STARTED, .status-RUNNING { color: var(--accent); }
.status-CANCELLED, .status-REVOKED { color: var(--yellow); }

.panel { display: none; }
.panel.active { display: block; }
.empty { text-align: center; padding: 40px 20px; color: var(--text-muted); }

@media (max-width: 768px) {
  .stats-grid { grid-template-columns: repeat(2, 1fr); }
  .grid-2 { grid-template-columns: 1fr; }
  header { flex-direction: column; align-items: flex-start; }
}
</style>
</head>
<body>
<div class="app">

  <header>
    <div>
      <h1>taskboard</h1>
      <div class="subtitle" id="subtitle">Background task dashboard</div>
    </div>
    <div class="controls">
      <span class="badge" id="status-badge">loading</span>
      <select id="range">
        <option value="24h">Last 24 hours</option>
        <option value="7d">Last 7 days</option>
        <option value="30d">Last 30 days</option>
        <option value="all" selected>All time</option>
      </select>
      <button class="btn" id="refresh">Refresh</button>
    </div>
  </header>

  <nav id="nav">
    <button class="active" data-tab="overview">Overview</button>
    <button data-tab="tiktok">TikTok</button>
    <button data-tab="facebook">Facebook</button>
  </nav>

  <div class="panel active" id="panel-main"></div>

  <div class="panel" id="panel-task">
    <div class="card">
      <h2 id="task-title">Task</h2>
      <div id="task-meta"></div>
      <div class="controls" style="margin-top:12px">
        <select id="task-account"></select>
        <select id="task-metric">
          <option value="app_usage">App usage</option>
          <option value="insights_usage">Insights usage</option>
          <option value="eta">ETA</option>
          <option value="time_stats">Time stats</option>
        </select>
        <button class="btn" id="task-logs-btn">Logs</button>
        <button class="btn" id="task-close">Close</button>
      </div>
    </div>
    <div class="card"><h2>Chart data</h2><div id="task-chart"></div></div>
    <div class="card"><h2>Ad accounts</h2><div id="task-accounts"></div></div>
    <div class="card" id="task-logs-card" style="display:none">
      <h2>Logs</h2><pre class="logs" id="task-logs"></pre>
    </div>
  </div>

</div>

<script>
// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------
let currentTab = 'overview';
let currentTask = null;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------
async function api(method, path) {
  const res = await fetch(path, { method });
  const body = await res.json();
  if (!res.ok) throw new Error(body.error || res.statusText);
  return body;
}

function esc(s) {
  return String(s ?? '').replace(/[&<>"']/g, c =>
    ({ '&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;', "'": '&#39;' }[c]));
}

function fmt(n) { return n === undefined || n === null ? '-' : n.toLocaleString(); }

function statCards(cards) {
  return '<div class="stats-grid">' + cards.map(([label, value]) =>
    `<div class="stat-card"><div class="value">${esc(value)}</div><div class="label">${esc(label)}</div></div>`
  ).join('') + '</div>';
}

function bars(title, entries, colorFor) {
  if (!entries.length) return `<div class="card"><h2>${esc(title)}</h2><div class="empty">No data</div></div>`;
  const max = Math.max(1, ...entries.map(e => e[1]));
  const rows = entries.map(([label, count]) =>
    `<div class="bar-row"><span class="name" title="${esc(label)}">${esc(label)}</span>` +
    `<span class="track"><span class="fill ${colorFor ? colorFor(label) : ''}" style="display:block;width:${(count / max) * 100}%"></span></span>` +
    `<span class="count">${fmt(count)}</span></div>`).join('');
  return `<div class="card"><h2>${esc(title)}</h2>${rows}</div>`;
}

function statusColor(label) {
  return { Success: 'green', Failed: 'red', Cancelled: 'yellow', Started: '' }[label] ?? '';
}

function usageColor(label) {
  return label.startsWith('Critical') ? 'red' : label.startsWith('Warning') ? 'yellow' : 'green';
}

function bucketPairs(b) {
  return [['Success', b.success], ['Failed', b.failed], ['Cancelled', b.cancelled], ['Started', b.started]];
}

function taskTable(rows) {
  if (!rows.length) return '<div class="card"><div class="empty">No tasks in this range.</div></div>';
  const body = rows.map(r =>
    `<tr class="clickable" data-job="${esc(r.job_id)}"><td class="mono">${esc(r.short_id)}</td>` +
    `<td>${esc(r.task_type)}</td><td>${esc(r.user_email)}</td>` +
    `<td class="status-${esc(r.status)}">${esc(r.status)}</td><td>${esc(r.start_time)}</td>` +
    `<td>${esc(r.end_time)}</td><td class="num">${esc(r.duration)}</td><td>${esc(r.message)}</td></tr>`).join('');
  return `<div class="card"><h2>Tasks</h2><table><thead><tr><th>Job</th><th>Type</th><th>User</th>` +
    `<th>Status</th><th>Started</th><th>Ended</th><th class="num">Duration</th><th>Message</th></tr></thead>` +
    `<tbody>${body}</tbody></table></div>`;
}

function facebookTable(rows) {
  if (!rows.length) return '<div class="card"><div class="empty">No Facebook tasks in this range.</div></div>';
  const body = rows.map(r =>
    `<tr class="clickable" data-job="${esc(r.job_id)}"><td class="mono">${esc(r.short_id)}</td>` +
    `<td>${esc(r.template)}</td><td>${esc(r.user_email)}</td>` +
    `<td class="status-${esc(r.status)}">${esc(r.status)}</td>` +
    `<td class="num">${r.backoff_sec.toFixed(1)}s</td><td class="num">${fmt(r.batch_count)}</td>` +
    `<td>${esc(r.message)}</td></tr>`).join('');
  return `<div class="card"><h2>Facebook Tasks</h2><table><thead><tr><th>Job</th><th>Template</th>` +
    `<th>User</th><th>Status</th><th class="num">Backoff</th><th class="num">Batches</th><th>Message</th>` +
    `</tr></thead><tbody>${body}</tbody></table></div>`;
}

// ---------------------------------------------------------------------------
// Tabs
// ---------------------------------------------------------------------------
function renderOverview(v) {
  const s = v.summary;
  return statCards([
    ['Total tasks', fmt(s.total)],
    ['Success rate', s.success_rate_pct.toFixed(1) + '%'],
    ['Avg duration', s.avg_duration_seconds.toFixed(2) + 's'],
    ['Active users', fmt(s.distinct_email_count)],
  ]) +
  '<div class="grid-2">' +
    bars('Task Status', v.statuses.map(e => [e.label, e.count])) +
    bars('Task Types', v.task_types.map(e => [e.label, e.count])) +
    bars('Top Users', v.top_users.map((e, i) => [v.top_user_labels[i], e.count])) +
    bars('Top Failed Users', v.top_failed_users.map(e => [e.label, e.count]), () => 'red') +
  '</div>' + taskTable(v.tasks);
}

function renderTiktok(v) {
  const timeline = v.api_timeline.series.map(s =>
    `<tr><td>${esc(s.name)}</td><td class="mono">${s.points.join(' ')}</td></tr>`).join('');
  return statCards([
    ['TikTok tasks', fmt(v.total_tasks)],
    ['Product tasks', fmt(v.product_tasks)],
    ['Creative tasks', fmt(v.creative_tasks)],
  ]) +
  '<div class="grid-2">' +
    bars('Task Types', [['Product', v.types.product], ['Creative', v.types.creative], ['Other', v.types.other]], () => 'purple') +
    bars('Status', bucketPairs(v.statuses), statusColor) +
  '</div>' +
  bars('API Calls by Endpoint', v.api_totals.map(e => [e.endpoint, e.total])) +
  (timeline ? `<div class="card"><h2>API Timeline (${esc(v.api_timeline.labels.join(', '))})</h2>` +
    `<table><tbody>${timeline}</tbody></table></div>` : '') +
  taskTable(v.tasks);
}

function renderFacebook(v) {
  const b = v.batches;
  return statCards([
    ['Facebook tasks', fmt(v.total_tasks)],
    ['Batches', fmt(b.total_batches)],
    ['Successful batches', fmt(b.successful_batches)],
    ['Total backoff', b.total_backoff_sec.toFixed(1) + 's'],
  ]) +
  '<div class="grid-2">' +
    bars('App Usage (per batch)', [['Critical (>95%)', v.usage.critical], ['Warning (75-95%)', v.usage.warning], ['Safe (<75%)', v.usage.safe]], usageColor) +
    bars('Report Types', [['Daily', v.types.daily], ['Performance', v.types.performance], ['Breakdown', v.types.breakdown], ['Other', v.types.other]], () => 'purple') +
    bars('Status', bucketPairs(v.statuses), statusColor) +
  '</div>' + facebookTable(v.tasks);
}

async function loadTab() {
  const range = document.getElementById('range').value;
  const el = document.getElementById('panel-main');
  try {
    const v = await api('GET', `/api/${currentTab}?range=${encodeURIComponent(range)}`);
    el.innerHTML = currentTab === 'tiktok' ? renderTiktok(v)
      : currentTab === 'facebook' ? renderFacebook(v) : renderOverview(v);
  } catch (e) {
    el.innerHTML = `<div class="card"><div class="empty">${esc(e.message)}</div></div>`;
  }
}

// ---------------------------------------------------------------------------
// Task detail
// ---------------------------------------------------------------------------
async function loadTask() {
  const account = document.getElementById('task-account').value || 'all';
  const metric = document.getElementById('task-metric').value;
  const q = `?account=${encodeURIComponent(account)}&metric=${encodeURIComponent(metric)}`;
  try {
    const v = await api('GET', `/api/tasks/${encodeURIComponent(currentTask)}${q}`);
    document.getElementById('task-title').textContent = 'Task ' + v.job_id;
    document.getElementById('task-meta').innerHTML =
      `<span class="status-${esc(v.status)}">${esc(v.status)}</span> &middot; ${esc(v.user_email)} &middot; started ${esc(v.started)}`;

    const select = document.getElementById('task-account');
    if (select.options.length === 0) {
      select.innerHTML = '<option value="all">All accounts</option>' +
        v.accounts.map(a => `<option value="${esc(a.account_id)}">${esc(a.account_id)}</option>`).join('');
    }

    const c = v.chart;
    document.getElementById('task-chart').innerHTML = !c ? '<div class="empty">No data for this account.</div>' :
      `<table><thead><tr><th>Batch</th>${c.datasets.map(d => `<th class="num">${esc(d.label)}</th>`).join('')}</tr></thead><tbody>` +
      c.labels.map((l, i) => `<tr><td>${esc(l)}</td>${c.datasets.map(d => {
        const val = d.data[i] ?? 0;
        const over = c.limit_line !== null && val >= c.limit_line ? ' status-FAILED' : '';
        return `<td class="num${over}">${val.toFixed(2)}</td>`;
      }).join('')}</tr>`).join('') + '</tbody></table>';

    document.getElementById('task-accounts').innerHTML = !v.accounts.length ? '<div class="empty">No accounts</div>' :
      '<table><thead><tr><th>Account</th><th class="num">Max insights %</th><th class="num">Max ETA</th><th>Tier</th><th class="num">Batches</th></tr></thead><tbody>' +
      v.accounts.map(a => `<tr><td class="mono">${esc(a.account_id)}</td><td class="num">${a.max_insights.toFixed(1)}</td>` +
        `<td class="num">${a.max_eta.toFixed(0)}s</td><td>${esc(a.tier)}</td><td class="num">${a.batch_count}</td></tr>`).join('') +
      '</tbody></table>';
  } catch (e) {
    document.getElementById('task-chart').innerHTML = `<div class="empty">${esc(e.message)}</div>`;
  }
}

function openTask(jobId) {
  currentTask = jobId;
  document.getElementById('task-account').innerHTML = '';
  document.getElementById('task-metric').value = 'app_usage';
  document.getElementById('task-logs-card').style.display = 'none';
  document.getElementById('panel-main').classList.remove('active');
  document.getElementById('panel-task').classList.add('active');
  loadTask();
}

function closeTask() {
  currentTask = null;
  document.getElementById('panel-task').classList.remove('active');
  document.getElementById('panel-main').classList.add('active');
}

async function loadLogs() {
  const card = document.getElementById('task-logs-card');
  const pre = document.getElementById('task-logs');
  card.style.display = 'block';
  pre.textContent = 'Loading...';
  try {
    const v = await api('GET', `/api/tasks/${encodeURIComponent(currentTask)}/logs`);
    pre.textContent = v.text;
  } catch (e) {
    pre.textContent = 'Error loading logs: ' + e.message;
  }
}

// ---------------------------------------------------------------------------
// Status and refresh
// ---------------------------------------------------------------------------
async function loadStatus() {
  const badge = document.getElementById('status-badge');
  try {
    const s = await api('GET', '/api/status');
    document.getElementById('subtitle').textContent = s.source;
    const st = s.store;
    if (!st.has_snapshot) {
      badge.className = 'badge err';
      badge.textContent = st.last_error ? 'fetch failed' : 'waiting for data';
    } else if (st.consecutive_failures > 0) {
      badge.className = 'badge warn';
      badge.textContent = 'stale: ' + st.consecutive_failures + ' failed refresh(es)';
    } else {
      badge.className = 'badge ok';
      badge.textContent = 'updated ' + new Date(st.fetched_at).toLocaleTimeString();
    }
    badge.title = st.last_error || '';
    return s;
  } catch (e) {
    badge.className = 'badge err';
    badge.textContent = 'offline';
  }
}

async function refreshAll() {
  await loadStatus();
  if (currentTask) loadTask(); else loadTab();
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------
document.getElementById('nav').addEventListener('click', e => {
  if (e.target.tagName !== 'BUTTON') return;
  document.querySelectorAll('nav button').forEach(b => b.classList.remove('active'));
  e.target.classList.add('active');
  currentTab = e.target.dataset.tab;
  closeTask();
  loadTab();
});

document.getElementById('panel-main').addEventListener('click', e => {
  const row = e.target.closest('tr[data-job]');
  if (row) openTask(row.dataset.job);
});

document.getElementById('range').addEventListener('change', loadTab);
document.getElementById('task-account').addEventListener('change', loadTask);
document.getElementById('task-metric').addEventListener('change', loadTask);
document.getElementById('task-logs-btn').addEventListener('click', loadLogs);
document.getElementById('task-close').addEventListener('click', closeTask);
document.getElementById('refresh').addEventListener('click', async () => {
  try { await api('POST', '/api/refresh'); } catch (e) { /* shown by status badge */ }
  refreshAll();
});

(async () => {
  const s = await loadStatus();
  if (s) document.getElementById('range').value = s.selection.range;
  loadTab();
  setInterval(refreshAll, (s ? s.poll_interval_secs : 30) * 1000);
})();
</script>
</body>
</html>
"##;
